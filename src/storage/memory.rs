//! In-Memory Storage
//!
//! Process-local storage backend, plus a recording mock for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::error::{SessionError, SessionResult, StorageError};
use crate::storage::backend::{missing_key, StorageBackend, StoredEntry};
use crate::types::StorageConfig;

/// In-memory storage backend.
pub struct InMemoryStorage {
    config: StorageConfig,
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl InMemoryStorage {
    /// Create new in-memory storage.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Insert a prepared entry under a logical key, bypassing the TTL policy.
    pub fn insert_entry(&self, key: &str, entry: StoredEntry) {
        self.entries
            .lock()
            .unwrap()
            .insert(self.config.namespaced(key), entry);
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn clear_expired(&self) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let initial_count = entries.len();
        entries.retain(|_, entry| entry.is_live());
        initial_count - entries.len()
    }

    /// Number of entries held, live or not.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new(StorageConfig::default())
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    async fn put(&self, key: &str, value: serde_json::Value) -> SessionResult<()> {
        let entry = StoredEntry::new(value, self.config.ttl);
        self.entries
            .lock()
            .unwrap()
            .insert(self.config.namespaced(key), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> SessionResult<serde_json::Value> {
        let path = self.config.namespaced(key);
        let mut entries = self.entries.lock().unwrap();

        let Some(entry) = entries.get(&path) else {
            return Err(missing_key(key));
        };
        if entry.is_live() {
            return Ok(entry.value.clone());
        }

        debug!(key = %path, "Stored entry expired");
        entries.remove(&path);
        Err(missing_key(key))
    }

    async fn has(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .get(&self.config.namespaced(key))
            .map(StoredEntry::is_live)
            .unwrap_or(false)
    }

    async fn forget(&self, key: &str) -> SessionResult<bool> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .remove(&self.config.namespaced(key))
            .is_some())
    }
}

/// Mock storage backend for testing.
///
/// Entries never expire; use [`MockStorageBackend::expire`] to simulate a TTL
/// running out.
#[derive(Default)]
pub struct MockStorageBackend {
    values: Mutex<HashMap<String, serde_json::Value>>,
    put_history: Mutex<Vec<(String, serde_json::Value)>>,
    get_history: Mutex<Vec<String>>,
    should_fail: Mutex<bool>,
}

impl MockStorageBackend {
    /// Create new mock storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set storage to fail all fallible operations.
    pub fn set_should_fail(&self, should_fail: bool) -> &Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    /// Pre-populate a value.
    pub fn add_value(&self, key: &str, value: serde_json::Value) -> &Self {
        self.values.lock().unwrap().insert(key.to_string(), value);
        self
    }

    /// Make a key unreadable, as if its TTL elapsed.
    pub fn expire(&self, key: &str) -> &Self {
        self.values.lock().unwrap().remove(key);
        self
    }

    /// Get put history.
    pub fn get_put_history(&self) -> Vec<(String, serde_json::Value)> {
        self.put_history.lock().unwrap().clone()
    }

    /// Get get history.
    pub fn get_get_history(&self) -> Vec<String> {
        self.get_history.lock().unwrap().clone()
    }

    fn check_error(&self) -> SessionResult<()> {
        if *self.should_fail.lock().unwrap() {
            return Err(SessionError::Storage(StorageError::WriteFailed {
                message: "Mock storage failure".to_string(),
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MockStorageBackend {
    async fn put(&self, key: &str, value: serde_json::Value) -> SessionResult<()> {
        self.check_error()?;

        self.put_history
            .lock()
            .unwrap()
            .push((key.to_string(), value.clone()));
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> SessionResult<serde_json::Value> {
        self.check_error()?;

        self.get_history.lock().unwrap().push(key.to_string());
        self.values
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| missing_key(key))
    }

    async fn has(&self, key: &str) -> bool {
        self.values.lock().unwrap().contains_key(key)
    }

    async fn forget(&self, key: &str) -> SessionResult<bool> {
        self.check_error()?;
        Ok(self.values.lock().unwrap().remove(key).is_some())
    }
}
