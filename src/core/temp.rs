// Temp directory lifecycle and eager-vs-deferred deletion of extracted files.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::error::{Error, ErrorKind};
use crate::core::exit_cleanup::delete_on_exit;

/// Default prefix of the per-process extraction directory.
pub const NATIVE_FOLDER_PATH_PREFIX: &str = "nativeutils";

/// Reports whether the filesystem holding a path exposes POSIX attributes.
pub type PosixProbe = fn(&Path) -> io::Result<bool>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeletionPolicy {
    /// Unlink right after the load call; the loader keeps its own mapping.
    Eager,
    /// Keep the file until process exit.
    Deferred,
}

impl DeletionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            DeletionPolicy::Eager => "eager",
            DeletionPolicy::Deferred => "deferred",
        }
    }
}

/// How a runtime picks its `DeletionPolicy`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DeletionMode {
    #[default]
    Auto,
    Eager,
    Deferred,
}

impl DeletionMode {
    pub fn parse(value: &str) -> Result<Self, Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DeletionMode::Auto),
            "eager" => Ok(DeletionMode::Eager),
            "deferred" => Ok(DeletionMode::Deferred),
            other => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unknown deletion mode: {other}"))
                .with_hint("Use one of: auto, eager, deferred.")),
        }
    }
}

#[cfg(unix)]
pub fn probe_posix_attributes(path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let meta = fs::metadata(path)?;
    Ok((meta.mode() & libc::S_IFMT as u32) != 0)
}

#[cfg(not(unix))]
pub fn probe_posix_attributes(_path: &Path) -> io::Result<bool> {
    Ok(false)
}

/// Owns the extraction directory and the cached deletion policy.
#[derive(Debug)]
pub struct TempLifecycle {
    root: PathBuf,
    prefix: String,
    mode: DeletionMode,
    probe: PosixProbe,
    dir: Option<PathBuf>,
    policy: Option<DeletionPolicy>,
}

impl TempLifecycle {
    pub fn new(root: PathBuf, prefix: String, mode: DeletionMode, probe: PosixProbe) -> Self {
        Self {
            root,
            prefix,
            mode,
            probe,
            dir: None,
            policy: None,
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Returns the extraction directory, creating it on first use.
    ///
    /// The directory is named `<prefix><unix nanos>` under the temp root and is
    /// registered for removal at exit. There is no fallback location.
    pub fn ensure_directory(&mut self) -> Result<&Path, Error> {
        if self.dir.is_none() {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_nanos())
                .unwrap_or_default();
            let dir = self.root.join(format!("{}{nanos}", self.prefix));
            fs::create_dir(&dir).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to create temp directory")
                    .with_path(&dir)
                    .with_source(err)
            })?;
            delete_on_exit(&dir);
            tracing::debug!(dir = %dir.display(), "created native temp directory");
            self.dir = Some(dir);
        }
        Ok(self.dir.as_deref().unwrap_or(&self.root))
    }

    /// Picks the deletion policy once and caches it for later files.
    pub fn deletion_policy(&mut self) -> DeletionPolicy {
        if let Some(policy) = self.policy {
            return policy;
        }
        let policy = match self.mode {
            DeletionMode::Eager => DeletionPolicy::Eager,
            DeletionMode::Deferred => DeletionPolicy::Deferred,
            DeletionMode::Auto => {
                let target = self.dir.as_deref().unwrap_or(&self.root);
                match (self.probe)(target) {
                    Ok(true) => DeletionPolicy::Eager,
                    Ok(false) => DeletionPolicy::Deferred,
                    Err(err) => {
                        tracing::debug!(error = %err, "posix probe failed; deferring deletion");
                        DeletionPolicy::Deferred
                    }
                }
            }
        };
        tracing::debug!(policy = policy.as_str(), "selected deletion policy");
        self.policy = Some(policy);
        policy
    }

    /// Disposes of an extracted file according to `policy`. Never fails.
    pub fn cleanup(&self, file: &Path, policy: DeletionPolicy) {
        match policy {
            DeletionPolicy::Eager => remove_or_defer(file),
            DeletionPolicy::Deferred => delete_on_exit(file),
        }
    }
}

/// Removes `file` now; if that fails while the file still exists, defer it.
pub(crate) fn remove_or_defer(file: &Path) {
    match fs::remove_file(file) {
        Ok(()) => {}
        Err(_) if !file.exists() => {}
        Err(err) => {
            tracing::warn!(
                path = %file.display(),
                error = %err,
                "could not delete extracted file; deferring to exit"
            );
            delete_on_exit(file);
        }
    }
}
