//! Purpose: The native runtime handle: single-load latch over extract-then-load.
//! Exports: `NativeRuntime`, `LoadOutcome`, `global`, `ensure_loaded`.
//! Role: Only place that sequences platform detection, extraction, loading, and cleanup.
//! Invariants: One mutex guards the latch, cached platform key, and temp lifecycle.
//! Invariants: The latch moves unloaded -> loaded only; failed attempts leave it unloaded.
//! Invariants: Cleanup of an extracted file runs whether or not the load call succeeded.
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use crate::core::config::LoaderConfig;
use crate::core::error::Error;
use crate::core::exit_cleanup::delete_on_exit;
use crate::core::extract::extract;
use crate::core::loader::{DynamicLoader, NativeLibrary, SystemLoader};
use crate::core::platform::{PlatformKey, identify};
use crate::core::resolve::{ResourcePath, resource_path};
use crate::core::resources::{DirResources, EmbeddedResources, ResourceBundle};
use crate::core::temp::{DeletionPolicy, TempLifecycle};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadOutcome {
    /// This call performed the extraction and load.
    Loaded,
    /// An earlier call already loaded the library; nothing was done.
    AlreadyLoaded,
}

impl LoadOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadOutcome::Loaded => "loaded",
            LoadOutcome::AlreadyLoaded => "already_loaded",
        }
    }
}

struct RuntimeState {
    platform: Option<PlatformKey>,
    temp: TempLifecycle,
    library: Option<NativeLibrary>,
}

impl RuntimeState {
    fn platform_key(&mut self, config: &LoaderConfig) -> Result<PlatformKey, Error> {
        if let Some(key) = self.platform {
            return Ok(key);
        }
        let key = if config.uses_host_platform() {
            PlatformKey::current()?
        } else {
            identify(&config.os, &config.arch)?
        };
        self.platform = Some(key);
        Ok(key)
    }
}

pub struct NativeRuntime {
    config: LoaderConfig,
    resources: Box<dyn ResourceBundle>,
    loader: Box<dyn DynamicLoader>,
    state: Mutex<RuntimeState>,
}

impl NativeRuntime {
    /// Runtime reading the embedded bundle (or `config.resource_dir`) and
    /// loading through the OS loader.
    pub fn new(config: LoaderConfig) -> Self {
        let resources: Box<dyn ResourceBundle> = match &config.resource_dir {
            Some(dir) => Box::new(DirResources::new(dir)),
            None => Box::new(EmbeddedResources),
        };
        Self::from_boxed(config, resources, Box::new(SystemLoader))
    }

    pub fn with_parts(
        config: LoaderConfig,
        resources: impl ResourceBundle + 'static,
        loader: impl DynamicLoader + 'static,
    ) -> Self {
        Self::from_boxed(config, Box::new(resources), Box::new(loader))
    }

    fn from_boxed(
        config: LoaderConfig,
        resources: Box<dyn ResourceBundle>,
        loader: Box<dyn DynamicLoader>,
    ) -> Self {
        let temp = TempLifecycle::new(
            config.temp_root.clone(),
            config.dir_prefix.clone(),
            config.deletion,
            config.posix_probe,
        );
        Self {
            config,
            resources,
            loader,
            state: Mutex::new(RuntimeState {
                platform: None,
                temp,
                library: None,
            }),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn resources(&self) -> &dyn ResourceBundle {
        self.resources.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.lock_state().library.is_some()
    }

    /// Where the loaded library was extracted to, if loaded.
    pub fn loaded_path(&self) -> Option<PathBuf> {
        self.lock_state()
            .library
            .as_ref()
            .map(|library| library.path().to_path_buf())
    }

    pub fn temp_dir(&self) -> Option<PathBuf> {
        self.lock_state().temp.dir().map(|dir| dir.to_path_buf())
    }

    pub fn platform(&self) -> Result<PlatformKey, Error> {
        self.lock_state().platform_key(&self.config)
    }

    /// Resource path of this runtime's platform library.
    pub fn library_resource(&self) -> Result<ResourcePath, Error> {
        self.platform().map(resource_path)
    }

    pub fn deletion_policy(&self) -> DeletionPolicy {
        self.lock_state().temp.deletion_policy()
    }

    /// Extracts an arbitrary bundled resource into this runtime's temp
    /// directory. The file is left for removal at process exit.
    pub fn extract(&self, path: &str) -> Result<PathBuf, Error> {
        let mut state = self.lock_state();
        let file = extract(&mut state.temp, self.resources.as_ref(), path)?;
        delete_on_exit(&file);
        Ok(file)
    }

    /// Makes the platform library available to the process.
    ///
    /// Concurrent callers serialize on the runtime lock; once one succeeds,
    /// every later call returns `AlreadyLoaded` without touching the
    /// filesystem. Failures are logged and returned, and a later call retries
    /// the whole sequence.
    pub fn ensure_loaded(&self) -> Result<LoadOutcome, Error> {
        let mut state = self.lock_state();
        if state.library.is_some() {
            return Ok(LoadOutcome::AlreadyLoaded);
        }
        match self.load_locked(&mut state) {
            Ok(library) => {
                tracing::info!(
                    path = %library.path().display(),
                    "successfully loaded native library"
                );
                state.library = Some(library);
                Ok(LoadOutcome::Loaded)
            }
            Err(err) => {
                tracing::warn!(error = %err, kind = err.kind().as_str(), "native library not loaded");
                Err(err)
            }
        }
    }

    fn load_locked(&self, state: &mut RuntimeState) -> Result<NativeLibrary, Error> {
        self.log_origin();
        let platform = state.platform_key(&self.config)?;
        let resource = resource_path(platform);
        let file = extract(&mut state.temp, self.resources.as_ref(), resource.as_str())?;

        tracing::debug!(file = %file.display(), "loading native library");
        let loaded = self.loader.load(&file);

        let policy = state.temp.deletion_policy();
        state.temp.cleanup(&file, policy);
        loaded
    }

    fn log_origin(&self) {
        let exe = std::env::current_exe()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());
        tracing::debug!(
            exe = %exe,
            resources = %self.resources.describe(),
            "preparing native library"
        );
    }

    fn lock_state(&self) -> MutexGuard<'_, RuntimeState> {
        // The latch is only set after a complete load, so a poisoned guard
        // still holds consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Process-wide runtime configured from the environment.
pub fn global() -> &'static NativeRuntime {
    static GLOBAL: OnceLock<NativeRuntime> = OnceLock::new();
    GLOBAL.get_or_init(|| NativeRuntime::new(LoaderConfig::from_env()))
}

/// Loads the platform library into the process through `global()`.
pub fn ensure_loaded() -> Result<LoadOutcome, Error> {
    global().ensure_loaded()
}
