//! Pluggable storage backend trait.
//!
//! `OsStorage` is the real backend, built on the same temp-file-then-rename
//! idiom used throughout this crate ([`crate::tempfile`], [`crate::lockfile`]).
//! `MemStorage` is an in-memory backend for tests that want to exercise code
//! written against `&dyn Storage` without touching a filesystem.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::Result;

/// Metadata about a stored entry, as returned by [`Storage::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub is_dir: bool,
    pub len: u64,
}

/// A storage capability set: read, atomically write, enumerate, and manage
/// files and directories without committing callers to `std::fs` directly.
///
/// Every write that needs to be crash-safe goes through `write_atomic`,
/// which callers should assume is implemented as write-to-temp + rename,
/// matching the pattern in `git-loose`'s loose object writer.
pub trait Storage: Send + Sync {
    /// Read the full contents of a file. `Err` with `NotFound` kind if absent.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write `data` to `path` atomically: the file at `path` either holds its
    /// previous contents or the new ones in full, never a partial write.
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// List the immediate entries of a directory, as file names (not full paths).
    fn list_dir(&self, path: &Path) -> Result<Vec<String>>;

    /// Stat a path. Returns `Ok(None)` if the path does not exist.
    fn stat(&self, path: &Path) -> Result<Option<Metadata>>;

    /// Remove a file. Not an error if the file does not exist.
    fn remove(&self, path: &Path) -> Result<()>;

    /// Rename/move a path, overwriting the destination if present.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Create a directory and all missing parent directories.
    fn mkdir_p(&self, path: &Path) -> Result<()>;
}

/// `Storage` backed by the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsStorage;

impl Storage for OsStorage {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        let mut tmp = crate::tempfile::TempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, data)?;
        tmp.persist(path)?;
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn stat(&self, path: &Path) -> Result<Option<Metadata>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(Metadata {
                is_dir: meta.is_dir(),
                len: meta.len(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(dir) = to.parent() {
            fs::create_dir_all(dir)?;
        }
        Ok(fs::rename(from, to)?)
    }

    fn mkdir_p(&self, path: &Path) -> Result<()> {
        Ok(fs::create_dir_all(path)?)
    }
}

/// In-memory `Storage`, for tests. Directories are implicit: any path with
/// stored descendants is considered to exist.
#[derive(Debug, Default)]
pub struct MemStorage {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemStorage {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound).into())
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        let files = self.files.lock().unwrap();
        let mut names: Vec<String> = files
            .keys()
            .filter_map(|p| p.strip_prefix(path).ok())
            .filter(|rel| rel.components().count() > 0)
            .map(|rel| rel.components().next().unwrap().as_os_str().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn stat(&self, path: &Path) -> Result<Option<Metadata>> {
        let files = self.files.lock().unwrap();
        if let Some(data) = files.get(path) {
            return Ok(Some(Metadata {
                is_dir: false,
                len: data.len() as u64,
            }));
        }
        let is_dir = files.keys().any(|p| p.starts_with(path) && p != path);
        if is_dir {
            Ok(Some(Metadata { is_dir: true, len: 0 }))
        } else {
            Ok(None)
        }
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        if let Some(data) = files.remove(from) {
            files.insert(to.to_path_buf(), data);
        }
        Ok(())
    }

    fn mkdir_p(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_storage_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = OsStorage;
        let path = dir.path().join("a/b/c.txt");
        storage.write_atomic(&path, b"hello").unwrap();
        assert_eq!(storage.read(&path).unwrap(), b"hello");
    }

    #[test]
    fn os_storage_stat_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = OsStorage;
        assert!(storage.stat(&dir.path().join("missing")).unwrap().is_none());
    }

    #[test]
    fn os_storage_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let storage = OsStorage;
        storage.remove(&dir.path().join("missing")).unwrap();
    }

    #[test]
    fn os_storage_list_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = OsStorage;
        storage.write_atomic(&dir.path().join("one"), b"1").unwrap();
        storage.write_atomic(&dir.path().join("two"), b"2").unwrap();
        let mut names = storage.list_dir(dir.path()).unwrap();
        names.sort();
        assert_eq!(names, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn mem_storage_write_read_roundtrip() {
        let storage = MemStorage::new();
        let path = Path::new("objects/ab/cdef");
        storage.write_atomic(path, b"payload").unwrap();
        assert_eq!(storage.read(path).unwrap(), b"payload");
    }

    #[test]
    fn mem_storage_read_missing_errors() {
        let storage = MemStorage::new();
        assert!(storage.read(Path::new("nope")).is_err());
    }

    #[test]
    fn mem_storage_rename() {
        let storage = MemStorage::new();
        storage.write_atomic(Path::new("a"), b"data").unwrap();
        storage.rename(Path::new("a"), Path::new("b")).unwrap();
        assert!(storage.read(Path::new("a")).is_err());
        assert_eq!(storage.read(Path::new("b")).unwrap(), b"data");
    }

    #[test]
    fn dyn_storage_object_safety() {
        let storage: Box<dyn Storage> = Box::new(MemStorage::new());
        storage.write_atomic(Path::new("x"), b"y").unwrap();
        assert_eq!(storage.read(Path::new("x")).unwrap(), b"y");
    }
}
