// Platform key to embedded resource path mapping and resource path validation.
use std::fmt;

use crate::core::error::{Error, ErrorKind};
use crate::core::platform::PlatformKey;

/// Shortest filename accepted for an extracted resource.
pub const MIN_FILE_NAME_LEN: usize = 3;

pub const LIB_OSX_AARCH_64: &str = "libglide_rs-osx-aarch_64.dylib";
pub const LIB_OSX_X86_64: &str = "libglide_rs-osx-x86_64.dylib";
pub const LIB_LINUX_AARCH_64: &str = "libglide_rs-linux-aarch_64.so";
pub const LIB_LINUX_X86_64: &str = "libglide_rs-linux-x86_64.so";

/// Every library filename that may be bundled. `build.rs` embeds the same set.
pub const LIBRARY_FILE_NAMES: [&str; 4] = [
    LIB_OSX_AARCH_64,
    LIB_OSX_X86_64,
    LIB_LINUX_AARCH_64,
    LIB_LINUX_X86_64,
];

/// Absolute, slash-delimited path into the bundled resource namespace.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ResourcePath {
    path: String,
    name_start: usize,
}

impl ResourcePath {
    /// Validates `path`: it must start with `/` and its last segment must be at
    /// least `MIN_FILE_NAME_LEN` characters long.
    pub fn parse(path: &str) -> Result<Self, Error> {
        if !path.starts_with('/') {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message(format!("resource path has to be absolute (start with '/'): {path}")));
        }
        // starts_with('/') guarantees a separator exists. A trailing '/' leaves
        // an empty filename, so directory-style paths are rejected rather than
        // resolved to their parent's name.
        let name_start = path.rfind('/').map_or(0, |idx| idx + 1);
        let file_name = &path[name_start..];
        if file_name.chars().count() < MIN_FILE_NAME_LEN {
            return Err(Error::new(ErrorKind::InvalidArgument).with_message(format!(
                "resource filename has to be at least {MIN_FILE_NAME_LEN} characters long: {path}"
            )));
        }
        Ok(Self {
            path: path.to_string(),
            name_start,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.path[self.name_start..]
    }

    /// The path without its leading separator, for lookups relative to a root.
    pub fn relative(&self) -> &str {
        self.path.trim_start_matches('/')
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

pub fn library_file_name(key: PlatformKey) -> &'static str {
    match key {
        PlatformKey::MacosAarch64 => LIB_OSX_AARCH_64,
        PlatformKey::MacosX86_64 => LIB_OSX_X86_64,
        PlatformKey::LinuxAarch64 => LIB_LINUX_AARCH_64,
        PlatformKey::LinuxX86_64 => LIB_LINUX_X86_64,
    }
}

pub fn resource_path(key: PlatformKey) -> ResourcePath {
    let file_name = library_file_name(key);
    ResourcePath {
        path: format!("/{file_name}"),
        name_start: 1,
    }
}
