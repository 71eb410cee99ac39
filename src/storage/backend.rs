//! Storage Backend
//!
//! Key/value persistence contract with per-entry expiration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult, StorageError};
use crate::types::TtlPolicy;

/// Storage backend interface.
///
/// Implementations prefix every key with their configured namespace and apply
/// the expiration policy they were constructed with.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store a value under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: serde_json::Value) -> SessionResult<()>;

    /// Retrieve a live value; absent or expired keys fail with `MissingKey`.
    async fn get(&self, key: &str) -> SessionResult<serde_json::Value>;

    /// Whether a live value exists for `key`. Never fails.
    async fn has(&self, key: &str) -> bool;

    /// Delete `key`, returning whether anything was removed.
    async fn forget(&self, key: &str) -> SessionResult<bool>;
}

/// A persisted value with its expiration instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// `None` means the entry never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    /// Create an entry written now under `policy`.
    pub fn new(value: serde_json::Value, policy: TtlPolicy) -> Self {
        Self::created_at(value, policy, Utc::now())
    }

    /// Create an entry as if written at `created_at`.
    pub fn created_at(
        value: serde_json::Value,
        policy: TtlPolicy,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            value,
            created_at,
            expires_at: policy.duration().map(|ttl| created_at + ttl),
        }
    }

    /// Readable at `now`; an entry stops being readable exactly at `expires_at`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| now < exp).unwrap_or(true)
    }

    pub fn is_live(&self) -> bool {
        self.is_live_at(Utc::now())
    }
}

/// Error for a key that is absent or expired.
pub fn missing_key(key: &str) -> SessionError {
    SessionError::Storage(StorageError::MissingKey {
        key: key.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_timed_entry_expires_exactly_at_ttl() {
        let created = Utc::now();
        let entry = StoredEntry::created_at(serde_json::json!("v"), TtlPolicy::Timed(20), created);

        assert_eq!(entry.expires_at, Some(created + Duration::minutes(20)));
        assert!(entry.is_live_at(created + Duration::minutes(19)));
        assert!(!entry.is_live_at(created + Duration::minutes(20)));
    }

    #[test]
    fn test_forever_entry_never_expires() {
        let created = Utc::now();
        let entry = StoredEntry::created_at(serde_json::json!(1), TtlPolicy::Forever, created);

        assert!(entry.expires_at.is_none());
        assert!(entry.is_live_at(created + Duration::days(3650)));
    }

    #[test]
    fn test_missing_key_error() {
        let error = missing_key("token");
        assert!(error.is_missing_key());
        assert_eq!(error.to_string(), "Storage error: No value for requested key: token");
    }
}
