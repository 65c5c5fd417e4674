// Process-exit deletion registry for temp files that cannot be removed eagerly.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once, PoisonError};

static PENDING: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
static HOOK: Once = Once::new();

/// Registers `path` for removal when the process exits normally.
///
/// Registration order is kept and duplicates are ignored; removal runs in
/// reverse order so a directory registered before its files is removed last.
pub(crate) fn delete_on_exit(path: &Path) {
    HOOK.call_once(install_hook);
    let mut pending = PENDING.lock().unwrap_or_else(PoisonError::into_inner);
    if !pending.iter().any(|existing| existing == path) {
        tracing::debug!(path = %path.display(), "registered for deletion at exit");
        pending.push(path.to_path_buf());
    }
}

#[cfg(test)]
pub(crate) fn is_pending(path: &Path) -> bool {
    let pending = PENDING.lock().unwrap_or_else(PoisonError::into_inner);
    pending.iter().any(|existing| existing == path)
}

#[cfg(unix)]
fn install_hook() {
    // SAFETY: `run_pending` is a plain `extern "C"` fn that never unwinds.
    let rc = unsafe { libc::atexit(run_pending) };
    if rc != 0 {
        tracing::warn!(rc, "failed to install exit cleanup hook");
    }
}

#[cfg(not(unix))]
fn install_hook() {
    tracing::debug!("exit cleanup hook unavailable on this target");
}

#[cfg(unix)]
extern "C" fn run_pending() {
    drain();
}

#[cfg(unix)]
fn drain() {
    let paths = {
        let mut pending = PENDING.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *pending)
    };
    for path in paths.iter().rev() {
        remove_quietly(path);
    }
}

fn remove_quietly(path: &Path) {
    // Directories go only when already empty.
    let _ = if path.is_dir() {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    };
}

#[cfg(test)]
mod tests {
    use super::{delete_on_exit, is_pending, remove_quietly};

    #[test]
    fn registration_is_idempotent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("libdup.so");
        delete_on_exit(&file);
        delete_on_exit(&file);
        assert!(is_pending(&file));
    }

    #[test]
    fn non_empty_directories_survive_removal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path().join("nativeutils1");
        std::fs::create_dir(&dir).expect("mkdir");
        std::fs::write(dir.join("libkeep.so"), b"x").expect("write");

        remove_quietly(&dir);
        assert!(dir.exists());

        remove_quietly(&dir.join("libkeep.so"));
        remove_quietly(&dir);
        assert!(!dir.exists());
    }
}
