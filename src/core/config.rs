// Runtime configuration: host identity, temp root, deletion mode, resource source.
use std::path::PathBuf;

use crate::core::temp::{DeletionMode, NATIVE_FOLDER_PATH_PREFIX, PosixProbe, probe_posix_attributes};

pub const ENV_TMPDIR: &str = "GLIDE_NATIVE_TMPDIR";
pub const ENV_DELETION: &str = "GLIDE_NATIVE_DELETION";
pub const ENV_RESOURCE_DIR: &str = "GLIDE_NATIVE_RESOURCE_DIR";

#[derive(Clone, Debug)]
pub struct LoaderConfig {
    pub os: String,
    pub arch: String,
    pub temp_root: PathBuf,
    pub dir_prefix: String,
    pub deletion: DeletionMode,
    pub posix_probe: PosixProbe,
    /// Read libraries from this directory instead of the embedded bundle.
    pub resource_dir: Option<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            temp_root: std::env::temp_dir(),
            dir_prefix: NATIVE_FOLDER_PATH_PREFIX.to_string(),
            deletion: DeletionMode::Auto,
            posix_probe: probe_posix_attributes,
            resource_dir: None,
        }
    }
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `GLIDE_NATIVE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| {
            std::env::var_os(key).map(|value| value.to_string_lossy().into_owned())
        })
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(root) = lookup(ENV_TMPDIR).filter(|value| !value.is_empty()) {
            config.temp_root = PathBuf::from(root);
        }
        if let Some(value) = lookup(ENV_DELETION) {
            match DeletionMode::parse(&value) {
                Ok(mode) => config.deletion = mode,
                Err(err) => tracing::warn!(%err, "ignoring {ENV_DELETION}"),
            }
        }
        if let Some(dir) = lookup(ENV_RESOURCE_DIR).filter(|value| !value.is_empty()) {
            config.resource_dir = Some(PathBuf::from(dir));
        }
        config
    }

    /// True when `os`/`arch` still name the running process's host.
    pub fn uses_host_platform(&self) -> bool {
        self.os == std::env::consts::OS && self.arch == std::env::consts::ARCH
    }

    pub fn with_platform(mut self, os: impl Into<String>, arch: impl Into<String>) -> Self {
        self.os = os.into();
        self.arch = arch.into();
        self
    }

    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }

    pub fn with_dir_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.dir_prefix = prefix.into();
        self
    }

    pub fn with_deletion(mut self, mode: DeletionMode) -> Self {
        self.deletion = mode;
        self
    }

    pub fn with_posix_probe(mut self, probe: PosixProbe) -> Self {
        self.posix_probe = probe;
        self
    }

    pub fn with_resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resource_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{ENV_DELETION, ENV_RESOURCE_DIR, ENV_TMPDIR, LoaderConfig};
    use crate::core::temp::DeletionMode;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn from_map(pairs: &[(&str, &str)]) -> LoaderConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LoaderConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_follow_host() {
        let config = from_map(&[]);
        assert_eq!(config.os, std::env::consts::OS);
        assert_eq!(config.arch, std::env::consts::ARCH);
        assert_eq!(config.temp_root, std::env::temp_dir());
        assert_eq!(config.dir_prefix, "nativeutils");
        assert_eq!(config.deletion, DeletionMode::Auto);
        assert!(config.resource_dir.is_none());
        assert!(config.uses_host_platform());
        assert!(!config.with_platform("Windows 10", "x86_64").uses_host_platform());
    }

    #[test]
    fn environment_overrides_apply() {
        let config = from_map(&[
            (ENV_TMPDIR, "/var/tmp/glide"),
            (ENV_DELETION, "deferred"),
            (ENV_RESOURCE_DIR, "/opt/glide/lib"),
        ]);
        assert_eq!(config.temp_root, PathBuf::from("/var/tmp/glide"));
        assert_eq!(config.deletion, DeletionMode::Deferred);
        assert_eq!(config.resource_dir, Some(PathBuf::from("/opt/glide/lib")));
    }

    #[test]
    fn bad_values_keep_defaults() {
        let config = from_map(&[(ENV_TMPDIR, ""), (ENV_DELETION, "sometimes")]);
        assert_eq!(config.temp_root, std::env::temp_dir());
        assert_eq!(config.deletion, DeletionMode::Auto);
    }
}
