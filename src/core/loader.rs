// OS dynamic-loading seam and the handle that keeps a loaded library mapped.
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind};

/// A library mapped into the process.
///
/// When the handle is owned here, dropping it unloads the library; the
/// process-wide runtime is never dropped, so its library stays mapped.
pub struct NativeLibrary {
    path: PathBuf,
    handle: Option<libloading::Library>,
}

impl NativeLibrary {
    pub fn new(path: impl Into<PathBuf>, handle: libloading::Library) -> Self {
        Self {
            path: path.into(),
            handle: Some(handle),
        }
    }

    /// A library whose OS handle is owned elsewhere.
    pub fn unmanaged(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            handle: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn handle(&self) -> Option<&libloading::Library> {
        self.handle.as_ref()
    }
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .field("managed", &self.handle.is_some())
            .finish()
    }
}

/// Maps a library file into the process.
pub trait DynamicLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<NativeLibrary, Error>;
}

/// `dlopen`-backed loader.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemLoader;

impl DynamicLoader for SystemLoader {
    fn load(&self, path: &Path) -> Result<NativeLibrary, Error> {
        // SAFETY: loading runs the library's initializers; the bundled
        // libraries are built alongside this crate and are trusted.
        let handle = unsafe { libloading::Library::new(path) }.map_err(|err| {
            Error::new(ErrorKind::Load)
                .with_message("native loader rejected library")
                .with_path(path)
                .with_source(err)
        })?;
        Ok(NativeLibrary::new(path, handle))
    }
}
