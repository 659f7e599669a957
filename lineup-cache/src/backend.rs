//! Key/value backends for the envelope store.
//!
//! Values are opaque strings at this level; the store owns all
//! (de)serialization of the envelope structure. Implementations must be
//! safe to share across tasks.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

/// Storage-medium failure. Never propagated past the store boundary.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage lock poisoned")]
    LockPoisoned,
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Persistent storage boundary: `get` / `set` / `delete` / `all_keys`.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Get the value stored under `key`, or `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Store `value` under `key`, replacing any prior value.
    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;

    /// Delete the value under `key`. Absent keys are a no-op.
    async fn delete(&self, key: &str) -> Result<(), BackendError>;

    /// Every key currently stored, in no particular order.
    async fn all_keys(&self) -> Result<Vec<String>, BackendError>;
}

/// In-memory backend. Used by tests and as the non-persistent mode on
/// platforms where nothing should touch disk.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let entries = self.entries.read().map_err(|_| BackendError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let mut entries = self.entries.write().map_err(|_| BackendError::LockPoisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        let mut entries = self.entries.write().map_err(|_| BackendError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }

    async fn all_keys(&self) -> Result<Vec<String>, BackendError> {
        let entries = self.entries.read().map_err(|_| BackendError::LockPoisoned)?;
        Ok(entries.keys().cloned().collect())
    }
}

/// File-per-key backend for platforms with a secure local directory.
///
/// Each key maps to one file under `dir`; the file body is the opaque
/// value. Keys are restricted to the characters our cache keys actually
/// use so a key can never escape the directory.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) a backend rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BackendError> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '-' | '_'))
        {
            return Err(BackendError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl KeyValueBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let path = self.path_for(key)?;
        std::fs::write(&path, value)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn all_keys(&self) -> Result<Vec<String>, BackendError> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    keys.push(name.to_string());
                }
            }
        }
        Ok(keys)
    }
}
