//! Storage classes for console state
//!
//! Session tokens and preferences must survive a restart (Durable); tabs and
//! page cache live only as long as the browsing session (Session).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Durable,
    Session,
}

/// Key/value JSON storage
pub trait StateStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn save(&self, key: &str, value: &Value) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// One pretty-printed JSON file per key under a root directory
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl StateStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let file = self.file_for(key);
        if !file.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(file)?;
        let value: Value = serde_json::from_str(&content)?;
        Ok(Some(value))
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
        }

        let content = serde_json::to_string_pretty(value)?;
        fs::write(self.file_for(key), content)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let file = self.file_for(key);
        if file.exists() {
            fs::remove_file(file)?;
        }
        Ok(())
    }
}

/// One store per storage class
#[derive(Clone)]
pub struct Persistence {
    durable: Arc<dyn StateStore>,
    session: Arc<dyn StateStore>,
}

impl Persistence {
    pub fn new(durable: Arc<dyn StateStore>, session: Arc<dyn StateStore>) -> Self {
        Self { durable, session }
    }

    /// Both classes in memory; nothing survives the process
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    pub fn store(&self, class: StorageClass) -> &Arc<dyn StateStore> {
        match class {
            StorageClass::Durable => &self.durable,
            StorageClass::Session => &self.session,
        }
    }

    /// Load and decode; failures are logged and read as absent
    pub fn read<T: DeserializeOwned>(&self, class: StorageClass, key: &str) -> Option<T> {
        match self.store(class).load(key) {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    tracing::warn!("Discarding unreadable {:?} state '{}': {}", class, key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to load {:?} state '{}': {}", class, key, e);
                None
            }
        }
    }

    /// Encode and save; failures are logged only
    pub fn write<T: Serialize>(&self, class: StorageClass, key: &str, value: &T) {
        let result = serde_json::to_value(value)
            .map_err(StorageError::from)
            .and_then(|json| self.store(class).save(key, &json));

        if let Err(e) = result {
            tracing::warn!("Failed to persist {:?} state '{}': {}", class, key, e);
        }
    }

    pub fn erase(&self, class: StorageClass, key: &str) {
        if let Err(e) = self.store(class).remove(key) {
            tracing::warn!("Failed to remove {:?} state '{}': {}", class, key, e);
        }
    }
}
