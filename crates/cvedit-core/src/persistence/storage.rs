//! Durable key-value storage
//!
//! The editor persists a single record under one named key. Backends:
//!
//! - [`FileStorage`]: one `{key}.json` file per key under the data directory,
//!   written atomically (temp file, fsync, rename)
//! - [`MemoryStorage`]: in-process map with a shared handle, used by tests
//!   and by callers that do not want anything on disk

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::error::{StorageError, StorageResult};

/// A string-valued key-value store
pub trait Storage {
    /// Read the value for `key`, `None` if nothing is stored
    fn read(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value for `key` in a single write
    fn write(&mut self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key`; deleting a missing key succeeds
    fn remove(&mut self, key: &str) -> StorageResult<()>;
}

/// File-backed storage rooted at a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadError { path, source: e }),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> StorageResult<()> {
        atomic_write(&self.path_for(key), value.as_bytes())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::from_io(e, path)),
        }
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// The target file is never left in a partially-written state.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|e| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, String>,
    writes: usize,
    fail: bool,
}

/// In-memory storage
///
/// Clones share the same map, so a caller can keep a handle and inspect
/// what the editor wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }

    /// Raw stored value for `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.borrow().entries.get(key).cloned()
    }

    /// Store a raw value without counting it as a write
    pub fn seed(&self, key: &str, value: impl Into<String>) {
        self.inner
            .borrow_mut()
            .entries
            .insert(key.to_string(), value.into());
    }

    /// Make every subsequent operation fail
    pub fn set_failing(&self, fail: bool) {
        self.inner.borrow_mut().fail = fail;
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let inner = self.inner.borrow();
        if inner.fail {
            return Err(StorageError::Unavailable("memory storage is failing".into()));
        }
        Ok(inner.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail {
            return Err(StorageError::Unavailable("memory storage is failing".into()));
        }
        inner.entries.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail {
            return Err(StorageError::Unavailable("memory storage is failing".into()));
        }
        inner.entries.remove(key);
        Ok(())
    }
}
