//! File Storage
//!
//! One JSON file per namespaced key inside a cache directory.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use url::form_urlencoded;

use crate::error::{SessionError, SessionResult, StorageError};
use crate::storage::backend::{missing_key, StorageBackend, StoredEntry};
use crate::types::StorageConfig;

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// File-backed storage.
///
/// Entries carry their own expiration instant, so a file written by another
/// process with a different TTL is still honored. Writes go through a temp
/// file and a rename, so readers see either the old or the new entry. Expired
/// files are left in place and overwritten by the next `put`.
pub struct FileStorage {
    config: StorageConfig,
    dir: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>, config: StorageConfig) -> SessionResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            SessionError::Storage(StorageError::WriteFailed {
                message: format!("Failed to create {}: {}", dir.display(), e),
            })
        })?;
        Ok(Self { config, dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `key`; distinct namespaced keys map to distinct files.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(entry_file_name(&self.config.namespaced(key)))
    }

    /// Load an entry whether live or not; `None` when no file exists.
    async fn load(&self, key: &str) -> SessionResult<Option<StoredEntry>> {
        let path = self.entry_path(key);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SessionError::Storage(StorageError::ReadFailed {
                    message: format!("Failed to read {}: {}", path.display(), e),
                }))
            }
        };

        serde_json::from_str(&contents).map(Some).map_err(|e| {
            SessionError::Storage(StorageError::CorruptedData {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn put(&self, key: &str, value: serde_json::Value) -> SessionResult<()> {
        let entry = StoredEntry::new(value, self.config.ttl);
        let contents = serde_json::to_string_pretty(&entry).map_err(|e| {
            SessionError::Storage(StorageError::WriteFailed {
                message: e.to_string(),
            })
        })?;

        let path = self.entry_path(key);
        let temp_path = self.dir.join(format!(
            ".{}.{}.{}.tmp",
            entry_file_name(&self.config.namespaced(key)),
            std::process::id(),
            TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        let written = match tokio::fs::write(&temp_path, contents).await {
            Ok(()) => tokio::fs::rename(&temp_path, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(SessionError::Storage(StorageError::WriteFailed {
                message: format!("Failed to write {}: {}", path.display(), e),
            }));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> SessionResult<serde_json::Value> {
        match self.load(key).await? {
            Some(entry) if entry.is_live() => Ok(entry.value),
            Some(_) => {
                debug!(key = key, "Stored entry expired");
                Err(missing_key(key))
            }
            None => Err(missing_key(key)),
        }
    }

    async fn has(&self, key: &str) -> bool {
        match self.load(key).await {
            Ok(entry) => entry.map(|e| e.is_live()).unwrap_or(false),
            Err(e) => {
                debug!(key = key, error = %e, "Treating unreadable entry as absent");
                false
            }
        }
    }

    async fn forget(&self, key: &str) -> SessionResult<bool> {
        let path = self.entry_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SessionError::Storage(StorageError::DeleteFailed {
                message: format!("Failed to remove {}: {}", path.display(), e),
            })),
        }
    }
}

/// Percent-encode the namespaced key. `*` is escaped too so the name is valid
/// on every platform; literal `%` is always escaped, so the mapping stays
/// one-to-one.
fn entry_file_name(namespaced_key: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(namespaced_key.as_bytes()).collect();
    format!("{}.json", encoded.replace('*', "%2A"))
}
