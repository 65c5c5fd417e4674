// Core modules: platform detection, resource extraction, temp lifecycle, loading.
pub mod config;
pub mod error;
pub(crate) mod exit_cleanup;
pub mod extract;
pub mod loader;
pub mod platform;
pub mod resolve;
pub mod resources;
pub mod temp;
