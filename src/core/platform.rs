// Host OS/architecture classification into the four supported platform keys.
use std::fmt;
use std::sync::OnceLock;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PlatformKey {
    MacosAarch64,
    MacosX86_64,
    LinuxAarch64,
    LinuxX86_64,
}

impl PlatformKey {
    pub const ALL: [PlatformKey; 4] = [
        PlatformKey::MacosAarch64,
        PlatformKey::MacosX86_64,
        PlatformKey::LinuxAarch64,
        PlatformKey::LinuxX86_64,
    ];

    /// Platform of the running process, classified once and then reused.
    pub fn current() -> Result<PlatformKey, Error> {
        static CURRENT: OnceLock<Option<PlatformKey>> = OnceLock::new();
        let key = CURRENT.get_or_init(|| {
            identify(std::env::consts::OS, std::env::consts::ARCH).ok()
        });
        match key {
            Some(key) => Ok(*key),
            None => Err(unsupported(std::env::consts::OS)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlatformKey::MacosAarch64 => "osx-aarch_64",
            PlatformKey::MacosX86_64 => "osx-x86_64",
            PlatformKey::LinuxAarch64 => "linux-aarch_64",
            PlatformKey::LinuxX86_64 => "linux-x86_64",
        }
    }

    pub fn is_macos(self) -> bool {
        matches!(self, PlatformKey::MacosAarch64 | PlatformKey::MacosX86_64)
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies an OS name and architecture name.
///
/// Matching is ASCII case-insensitive substring matching: any architecture
/// mentioning `aarch` or `arm` is ARM, everything else is treated as x86_64.
/// Only macOS and Linux are supported; any other OS is an `Unsupported` error.
pub fn identify(os: &str, arch: &str) -> Result<PlatformKey, Error> {
    let os = os.to_ascii_lowercase();
    let arch = arch.to_ascii_lowercase();
    let is_arm = arch.contains("aarch") || arch.contains("arm");

    let key = if os.contains("mac") {
        if is_arm {
            PlatformKey::MacosAarch64
        } else {
            PlatformKey::MacosX86_64
        }
    } else if os.contains("linux") {
        if is_arm {
            PlatformKey::LinuxAarch64
        } else {
            PlatformKey::LinuxX86_64
        }
    } else {
        return Err(unsupported(&os));
    };
    tracing::debug!(platform = %key, os = %os, arch = %arch, "determined native platform");
    Ok(key)
}

fn unsupported(os: &str) -> Error {
    Error::new(ErrorKind::Unsupported)
        .with_message(format!("OS not supported: {os}"))
        .with_hint("Glide native libraries are only available for macOS and Linux.")
}
