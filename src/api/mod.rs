//! Purpose: Define the public Rust API boundary for loading the Glide native library.
//! Exports: Runtime handle, configuration, resource bundles, loader seam, and errors.
//! Role: Stable surface for hosts and the CLI; hides internal sequencing details.
//! Invariants: Loading only happens through `NativeRuntime::ensure_loaded`.
//! Invariants: Internal helpers (exit cleanup registry) are not re-exported.

mod runtime;

pub use crate::core::config::{ENV_DELETION, ENV_RESOURCE_DIR, ENV_TMPDIR, LoaderConfig};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::loader::{DynamicLoader, NativeLibrary, SystemLoader};
pub use crate::core::platform::{PlatformKey, identify};
pub use crate::core::resolve::{
    LIBRARY_FILE_NAMES, MIN_FILE_NAME_LEN, ResourcePath, library_file_name, resource_path,
};
pub use crate::core::resources::{
    DirResources, EmbeddedResources, MemoryResources, ResourceBundle,
};
pub use crate::core::temp::{
    DeletionMode, DeletionPolicy, NATIVE_FOLDER_PATH_PREFIX, PosixProbe, probe_posix_attributes,
};
pub use runtime::{LoadOutcome, NativeRuntime, ensure_loaded, global};
