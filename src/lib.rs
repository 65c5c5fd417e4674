//! Purpose: Load the platform's embedded `libglide_rs` shared library into the process once.
//! Exports: `api` (runtime handle, configuration, errors) plus `ensure_loaded` / `global`.
//! Role: Library crate backing the `glide-native` CLI and any host embedding the library.
//! Invariants: Libraries are extracted to a per-process temp directory before loading.
//! Invariants: No extracted file outlives the process except when exit hooks do not run.
mod core;

pub mod api;

pub use api::{Error, ErrorKind, LoadOutcome, NativeRuntime, ensure_loaded, global};
