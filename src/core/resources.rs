// Packaged resource namespaces the extractor reads library bytes from.
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::core::resolve::ResourcePath;

include!(concat!(env!("OUT_DIR"), "/embedded_resources.rs"));

/// A read-only namespace of resources addressed by `ResourcePath`.
pub trait ResourceBundle: Send + Sync {
    /// Opens the resource as a byte stream, or `Ok(None)` when it is absent.
    fn open(&self, path: &ResourcePath) -> io::Result<Option<Box<dyn Read + '_>>>;

    /// Human-readable origin of the bundle, for diagnostics.
    fn describe(&self) -> String;
}

/// Libraries compiled into this binary by `build.rs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedResources;

impl EmbeddedResources {
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, usize)> {
        EMBEDDED.iter().map(|(path, bytes)| (*path, bytes.len()))
    }

    pub fn get(&self, path: &str) -> Option<&'static [u8]> {
        EMBEDDED
            .iter()
            .find(|(candidate, _)| *candidate == path)
            .map(|(_, bytes)| *bytes)
    }
}

impl ResourceBundle for EmbeddedResources {
    fn open(&self, path: &ResourcePath) -> io::Result<Option<Box<dyn Read + '_>>> {
        Ok(self
            .get(path.as_str())
            .map(|bytes| Box::new(bytes) as Box<dyn Read + '_>))
    }

    fn describe(&self) -> String {
        format!("embedded ({} entries)", EMBEDDED.len())
    }
}

/// A directory on disk laid out like the packaged namespace.
#[derive(Clone, Debug)]
pub struct DirResources {
    root: PathBuf,
}

impl DirResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceBundle for DirResources {
    fn open(&self, path: &ResourcePath) -> io::Result<Option<Box<dyn Read + '_>>> {
        let full = self.root.join(path.relative());
        let file = match File::open(&full) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        if !file.metadata()?.is_file() {
            return Ok(None);
        }
        Ok(Some(Box::new(file)))
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

/// Resources held in memory, keyed by absolute resource path.
#[derive(Clone, Debug, Default)]
pub struct MemoryResources {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.entries.insert(path.into(), bytes.into());
        self
    }

    pub fn with(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl ResourceBundle for MemoryResources {
    fn open(&self, path: &ResourcePath) -> io::Result<Option<Box<dyn Read + '_>>> {
        Ok(self
            .entries
            .get(path.as_str())
            .map(|bytes| Box::new(bytes.as_slice()) as Box<dyn Read + '_>))
    }

    fn describe(&self) -> String {
        format!("memory ({} entries)", self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::{DirResources, EmbeddedResources, MemoryResources, ResourceBundle};
    use crate::core::resolve::{LIBRARY_FILE_NAMES, ResourcePath};
    use std::io::Read;

    fn read_all(bundle: &dyn ResourceBundle, path: &str) -> Option<Vec<u8>> {
        let path = ResourcePath::parse(path).expect("path");
        let mut reader = bundle.open(&path).expect("open")?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).expect("read");
        Some(buf)
    }

    #[test]
    fn memory_lookup_is_exact() {
        let bundle = MemoryResources::new().with("/libabc.so", b"abc".to_vec());
        assert_eq!(read_all(&bundle, "/libabc.so"), Some(b"abc".to_vec()));
        assert_eq!(read_all(&bundle, "/other/libabc.so"), None);
    }

    #[test]
    fn directory_lookup_strips_leading_separator() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(temp.path().join("nested")).expect("mkdir");
        std::fs::write(temp.path().join("nested").join("libdir.so"), b"dir").expect("write");

        let bundle = DirResources::new(temp.path());
        assert_eq!(read_all(&bundle, "/nested/libdir.so"), Some(b"dir".to_vec()));
        assert_eq!(read_all(&bundle, "/nested/missing.so"), None);
        assert_eq!(read_all(&bundle, "/nested"), None);
    }

    #[test]
    fn embedded_entries_use_known_names() {
        let bundle = EmbeddedResources;
        for (path, len) in bundle.entries() {
            let name = path.strip_prefix('/').expect("absolute");
            assert!(LIBRARY_FILE_NAMES.contains(&name), "{path}");
            assert_eq!(bundle.get(path).map(|bytes| bytes.len()), Some(len));
        }
        assert!(bundle.get("/not-bundled.so").is_none());
    }
}
