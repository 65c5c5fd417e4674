// Runtime load-latch, extraction, and cleanup behavior against counting fakes.
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use glide_native::api::{
    DeletionMode, DynamicLoader, Error, ErrorKind, LoadOutcome, LoaderConfig, MemoryResources,
    NativeLibrary, NativeRuntime, ResourceBundle, ResourcePath, SystemLoader,
};

const LINUX_X86: &str = "/libglide_rs-linux-x86_64.so";

#[derive(Clone, Default)]
struct Counters {
    opens: Arc<AtomicUsize>,
    loads: Arc<AtomicUsize>,
}

impl Counters {
    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

struct CountingResources {
    inner: MemoryResources,
    counters: Counters,
}

impl ResourceBundle for CountingResources {
    fn open(&self, path: &ResourcePath) -> io::Result<Option<Box<dyn Read + '_>>> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(path)
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}

/// Accepts every file after `fail_first` rejections, recording what it saw.
struct CountingLoader {
    counters: Counters,
    fail_first: usize,
    delay: Duration,
    seen: Arc<std::sync::Mutex<Vec<(PathBuf, Vec<u8>)>>>,
}

impl CountingLoader {
    fn new(counters: &Counters) -> Self {
        Self {
            counters: counters.clone(),
            fail_first: 0,
            delay: Duration::ZERO,
            seen: Arc::default(),
        }
    }
}

impl DynamicLoader for CountingLoader {
    fn load(&self, path: &Path) -> Result<NativeLibrary, Error> {
        let call = self.counters.loads.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        let bytes = std::fs::read(path).expect("extracted file exists during load");
        self.seen
            .lock()
            .expect("seen lock")
            .push((path.to_path_buf(), bytes));
        if call < self.fail_first {
            return Err(Error::new(ErrorKind::Load).with_message("simulated rejection"));
        }
        Ok(NativeLibrary::unmanaged(path))
    }
}

fn linux_config(root: &Path) -> LoaderConfig {
    LoaderConfig::new()
        .with_platform("Linux", "amd64")
        .with_temp_root(root)
}

fn counting_resources(counters: &Counters, bytes: &[u8]) -> CountingResources {
    CountingResources {
        inner: MemoryResources::new().with(LINUX_X86, bytes.to_vec()),
        counters: counters.clone(),
    }
}

fn failing_probe(_: &Path) -> io::Result<bool> {
    Err(io::Error::new(io::ErrorKind::PermissionDenied, "security restriction"))
}

#[test]
fn concurrent_callers_load_once() {
    let temp = tempfile::tempdir().expect("tempdir");
    let counters = Counters::default();
    let mut loader = CountingLoader::new(&counters);
    loader.delay = Duration::from_millis(50);
    let runtime = Arc::new(NativeRuntime::with_parts(
        linux_config(temp.path()),
        counting_resources(&counters, b"\x7fELF fake"),
        loader,
    ));

    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));
    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let runtime = Arc::clone(&runtime);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                runtime.ensure_loaded().expect("ensure_loaded")
            })
        })
        .collect();

    let outcomes: Vec<LoadOutcome> = handles
        .into_iter()
        .map(|handle| handle.join().expect("join"))
        .collect();

    assert_eq!(counters.loads(), 1);
    assert_eq!(counters.opens(), 1);
    assert_eq!(
        outcomes.iter().filter(|o| **o == LoadOutcome::Loaded).count(),
        1
    );
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == LoadOutcome::AlreadyLoaded)
            .count(),
        workers - 1
    );
    assert!(runtime.is_loaded());
}

#[test]
fn second_call_is_a_no_op() {
    let temp = tempfile::tempdir().expect("tempdir");
    let counters = Counters::default();
    let runtime = NativeRuntime::with_parts(
        linux_config(temp.path()),
        counting_resources(&counters, b"library"),
        CountingLoader::new(&counters),
    );

    assert_eq!(runtime.ensure_loaded().expect("first"), LoadOutcome::Loaded);
    let opens = counters.opens();
    let loads = counters.loads();
    let dirs = std::fs::read_dir(temp.path()).expect("read_dir").count();

    assert_eq!(runtime.ensure_loaded().expect("second"), LoadOutcome::AlreadyLoaded);
    assert_eq!(counters.opens(), opens);
    assert_eq!(counters.loads(), loads);
    assert_eq!(std::fs::read_dir(temp.path()).expect("read_dir").count(), dirs);
}

#[test]
fn unsupported_platform_touches_nothing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let counters = Counters::default();
    let config = LoaderConfig::new()
        .with_platform("Windows 11", "amd64")
        .with_temp_root(temp.path());
    let runtime = NativeRuntime::with_parts(
        config,
        counting_resources(&counters, b"library"),
        CountingLoader::new(&counters),
    );

    let err = runtime.ensure_loaded().expect_err("unsupported");
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert_eq!(counters.opens(), 0);
    assert_eq!(counters.loads(), 0);
    assert!(runtime.temp_dir().is_none());
    assert_eq!(std::fs::read_dir(temp.path()).expect("read_dir").count(), 0);
    assert!(!runtime.is_loaded());
}

#[test]
fn loader_sees_complete_copy() {
    let temp = tempfile::tempdir().expect("tempdir");
    let counters = Counters::default();
    let bytes: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let loader = CountingLoader::new(&counters);
    let seen = Arc::clone(&loader.seen);
    let runtime = NativeRuntime::with_parts(
        linux_config(temp.path()),
        counting_resources(&counters, &bytes),
        loader,
    );

    runtime.ensure_loaded().expect("load");
    let seen = seen.lock().expect("seen lock");
    assert_eq!(seen.len(), 1);
    assert!(seen[0].0.ends_with("libglide_rs-linux-x86_64.so"));
    assert_eq!(seen[0].1, bytes);
}

#[cfg(unix)]
#[test]
fn eager_policy_removes_file_after_load() {
    let temp = tempfile::tempdir().expect("tempdir");
    let counters = Counters::default();
    let runtime = NativeRuntime::with_parts(
        linux_config(temp.path()).with_deletion(DeletionMode::Auto),
        counting_resources(&counters, b"library"),
        CountingLoader::new(&counters),
    );

    runtime.ensure_loaded().expect("load");
    let path = runtime.loaded_path().expect("loaded path");
    assert!(!path.exists());
    assert!(runtime.temp_dir().expect("temp dir").is_dir());
}

#[test]
fn failing_probe_defers_deletion() {
    let temp = tempfile::tempdir().expect("tempdir");
    let counters = Counters::default();
    let runtime = NativeRuntime::with_parts(
        linux_config(temp.path()).with_posix_probe(failing_probe),
        counting_resources(&counters, b"library"),
        CountingLoader::new(&counters),
    );

    runtime.ensure_loaded().expect("load");
    let path = runtime.loaded_path().expect("loaded path");
    assert!(path.exists());
    assert_eq!(std::fs::read(path).expect("read"), b"library");
}

#[test]
fn failed_load_leaves_latch_open_for_retry() {
    let temp = tempfile::tempdir().expect("tempdir");
    let counters = Counters::default();
    let mut loader = CountingLoader::new(&counters);
    loader.fail_first = 1;
    let runtime = NativeRuntime::with_parts(
        linux_config(temp.path()).with_deletion(DeletionMode::Eager),
        counting_resources(&counters, b"library"),
        loader,
    );

    let err = runtime.ensure_loaded().expect_err("first attempt fails");
    assert_eq!(err.kind(), ErrorKind::Load);
    assert!(!runtime.is_loaded());
    let dir = runtime.temp_dir().expect("temp dir");
    assert_eq!(std::fs::read_dir(&dir).expect("read_dir").count(), 0);

    assert_eq!(runtime.ensure_loaded().expect("retry"), LoadOutcome::Loaded);
    assert_eq!(counters.loads(), 2);
    assert_eq!(counters.opens(), 2);
    assert_eq!(runtime.temp_dir(), Some(dir));
}

#[test]
fn missing_resource_is_not_found() {
    let temp = tempfile::tempdir().expect("tempdir");
    let counters = Counters::default();
    let resources = CountingResources {
        inner: MemoryResources::new().with("/libglide_rs-osx-x86_64.dylib", b"macho".to_vec()),
        counters: counters.clone(),
    };
    let runtime =
        NativeRuntime::with_parts(linux_config(temp.path()), resources, CountingLoader::new(&counters));

    let err = runtime.ensure_loaded().expect_err("missing");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(counters.loads(), 0);
    let dir = runtime.temp_dir().expect("temp dir");
    assert_eq!(std::fs::read_dir(dir).expect("read_dir").count(), 0);
}

#[test]
fn system_loader_rejects_corrupt_binary() {
    let temp = tempfile::tempdir().expect("tempdir");
    let resources = MemoryResources::new().with(LINUX_X86, b"not a shared object".to_vec());
    let runtime = NativeRuntime::with_parts(
        linux_config(temp.path()).with_deletion(DeletionMode::Eager),
        resources,
        SystemLoader,
    );

    let err = runtime.ensure_loaded().expect_err("corrupt");
    assert_eq!(err.kind(), ErrorKind::Load);
    assert!(std::error::Error::source(&err).is_some());
    assert!(!runtime.is_loaded());
    let dir = runtime.temp_dir().expect("temp dir");
    assert_eq!(std::fs::read_dir(dir).expect("read_dir").count(), 0);
}
