// Copies a bundled resource byte-for-byte into the runtime's temp directory.
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind};
use crate::core::resolve::ResourcePath;
use crate::core::resources::ResourceBundle;
use crate::core::temp::{TempLifecycle, remove_or_defer};

/// Extracts `path` from `resources` into the lifecycle's temp directory.
///
/// The path is validated before anything touches the filesystem. A missing
/// resource is `NotFound`; open/copy failures are `Io`. On either failure any
/// partially written target is removed before the error is returned.
///
/// Bytes are staged in a sibling file and renamed over the target, so a
/// library already mapped from the target keeps its inode intact.
pub fn extract(
    lifecycle: &mut TempLifecycle,
    resources: &dyn ResourceBundle,
    path: &str,
) -> Result<PathBuf, Error> {
    let resource = ResourcePath::parse(path)?;
    let target = lifecycle.ensure_directory()?.join(resource.file_name());

    let mut reader = match resources.open(&resource) {
        Ok(Some(reader)) => reader,
        Ok(None) => {
            remove_or_defer(&target);
            return Err(Error::new(ErrorKind::NotFound)
                .with_message(format!("resource {resource} was not found inside the artifact"))
                .with_hint("The distribution may be incomplete for this platform."));
        }
        Err(err) => {
            remove_or_defer(&target);
            return Err(io_error(&resource, &target, err));
        }
    };

    let staging = staging_path(&target);
    if let Err(err) = write_target(&mut reader, &staging, &target) {
        remove_or_defer(&staging);
        remove_or_defer(&target);
        return Err(io_error(&resource, &target, err));
    }
    tracing::debug!(resource = %resource, path = %target.display(), "extracted native resource");
    Ok(target)
}

fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.partial"))
}

fn write_target(reader: &mut dyn io::Read, staging: &Path, target: &Path) -> io::Result<u64> {
    let copied = {
        let mut file = File::create(staging)?;
        let copied = io::copy(reader, &mut file)?;
        file.sync_all()?;
        mark_executable(&file);
        copied
    };
    fs::rename(staging, target)?;
    Ok(copied)
}

#[cfg(unix)]
fn mark_executable(file: &File) {
    use std::os::unix::fs::PermissionsExt;

    let _ = file.set_permissions(std::fs::Permissions::from_mode(0o755));
}

#[cfg(not(unix))]
fn mark_executable(_file: &File) {}

fn io_error(resource: &ResourcePath, target: &Path, err: io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message(format!("failed to extract {resource}"))
        .with_path(target)
        .with_source(err)
}
