//! Durable key-value state.
//!
//! The planner persists two snapshots (the waypoint list and the selected
//! routing profile) as JSON strings under fixed keys. Storage is injected
//! through [`StateStorage`] so sessions can run against memory in tests and
//! against a directory on disk in applications.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use log::debug;

use crate::error::{PlannerError, Result};

/// Read/write access to named snapshots.
///
/// Writes overwrite the previous value for the key.
pub trait StateStorage: Send + Sync {
    /// Value stored under `key`, or `None` if nothing was written yet.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`.
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// In-process storage. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys written so far.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| PlannerError::Storage("memory storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| PlannerError::Storage("memory storage lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
///
/// Writes go to a temporary file first and are renamed into place, so a crash
/// mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` for snapshots, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            PlannerError::Storage(format!("cannot create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StateStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PlannerError::Storage(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));

        fs::write(&tmp, value)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| {
                PlannerError::Storage(format!("cannot write {}: {}", path.display(), e))
            })?;

        debug!("[FileStorage] wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}
