//! Key-value partitions backing the recovery store.
//!
//! Two implementations:
//! - [`MemoryPartition`]: process-local map, for tests and hosts without storage
//! - [`FilePartition`]: JSON map in one file, replaced atomically on every write

use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::StoreError;

/// A small string-to-string store.
///
/// Writes are durable once they return `Ok`. Reads of a missing key return
/// `Ok(None)`; a partition that cannot be read at all returns an error.
pub trait Partition: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory partition.
#[derive(Debug, Default)]
pub struct MemoryPartition {
    map: Mutex<BTreeMap<String, String>>,
}

impl MemoryPartition {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StoreError> {
        self.map
            .lock()
            .map_err(|_| StoreError::Unavailable("memory partition lock poisoned".into()))
    }
}

impl Partition for MemoryPartition {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Partition persisted as a JSON object in a single file.
///
/// Every mutation rewrites the whole file through a temp file in the same
/// directory followed by a rename, so readers never observe a torn write.
/// On Unix the file is created with mode `0600`.
#[derive(Debug)]
pub struct FilePartition {
    path: PathBuf,
    io: Mutex<()>,
}

impl FilePartition {
    /// Creates a partition backed by `path`. Nothing is touched until the first access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: Mutex::new(()),
        }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn save(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let content = serde_json::to_vec_pretty(map)?;
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| self.io_err(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_err(e))?;
        }

        tmp.write_all(&content).map_err(|e| self.io_err(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_err(e.error))?;

        debug!(path = %self.path.display(), keys = map.len(), "partition written");
        Ok(())
    }

    fn update(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> Result<(), StoreError> {
        let _io = self
            .io
            .lock()
            .map_err(|_| StoreError::Unavailable("file partition lock poisoned".into()))?;
        // A corrupt file is replaced rather than blocking every future write.
        let mut map = match self.load() {
            Ok(map) => map,
            Err(StoreError::Serialize(_)) => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        if f(&mut map) {
            self.save(&map)?;
        }
        Ok(())
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Partition for FilePartition {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _io = self
            .io
            .lock()
            .map_err(|_| StoreError::Unavailable("file partition lock poisoned".into()))?;
        Ok(self.load()?.remove(key))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|map| {
            map.insert(key.to_owned(), value.to_owned());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|map| map.remove(key).is_some())
    }
}
