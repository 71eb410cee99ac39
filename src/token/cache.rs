//! Token Cache
//!
//! Typed access to the `token` and `resources` records of a storage backend.

use std::sync::Arc;
use tracing::debug;

use crate::error::{SessionError, SessionResult, StorageError};
use crate::storage::StorageBackend;
use crate::token::TokenCipher;
use crate::types::{ResourceMap, TokenBundle};

/// Logical key of the token bundle.
pub const TOKEN_KEY: &str = "token";
/// Logical key of the resource map.
pub const RESOURCES_KEY: &str = "resources";

/// Stateless typed facade over a [`StorageBackend`].
///
/// The token record is encrypted before it reaches the backend; the resource
/// map is stored as plain JSON.
pub struct TokenCache<S: StorageBackend> {
    storage: Arc<S>,
    cipher: TokenCipher,
}

impl<S: StorageBackend> Clone for TokenCache<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            cipher: self.cipher.clone(),
        }
    }
}

impl<S: StorageBackend> TokenCache<S> {
    /// Create new token cache.
    pub fn new(storage: Arc<S>, cipher: TokenCipher) -> Self {
        Self { storage, cipher }
    }

    /// Underlying storage backend.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Persist a token bundle; incomplete bundles are rejected.
    pub async fn put_token_data(&self, bundle: &TokenBundle) -> SessionResult<()> {
        bundle.validate()?;
        let plaintext = serde_json::to_vec(bundle).map_err(|e| {
            SessionError::Storage(StorageError::WriteFailed {
                message: e.to_string(),
            })
        })?;
        let sealed = self.cipher.seal(TOKEN_KEY, &plaintext)?;
        self.storage
            .put(TOKEN_KEY, serde_json::Value::String(sealed))
            .await?;
        debug!(instance_url = %bundle.instance_url, "Token bundle stored");
        Ok(())
    }

    /// Read the token bundle; a miss surfaces as `MissingKey`, an
    /// undecryptable record as `CorruptedData`.
    pub async fn get_token_data(&self) -> SessionResult<TokenBundle> {
        let value = self.storage.get(TOKEN_KEY).await?;
        let serde_json::Value::String(sealed) = value else {
            return Err(corrupted(TOKEN_KEY, "token record is not encrypted"));
        };
        let plaintext = self.cipher.open(TOKEN_KEY, &sealed)?;
        serde_json::from_slice(&plaintext).map_err(|e| corrupted(TOKEN_KEY, &e.to_string()))
    }

    /// Whether a live token bundle is stored.
    pub async fn has_token(&self) -> bool {
        self.storage.has(TOKEN_KEY).await
    }

    /// Remove the token bundle from storage.
    pub async fn forget_token(&self) -> SessionResult<bool> {
        self.storage.forget(TOKEN_KEY).await
    }

    /// Persist the resource map.
    pub async fn store_resources(&self, resources: &ResourceMap) -> SessionResult<()> {
        self.put_json(RESOURCES_KEY, resources).await?;
        debug!(count = resources.len(), "Resource map stored");
        Ok(())
    }

    /// Read the resource map; a miss surfaces as `MissingKey`.
    pub async fn get_resources(&self) -> SessionResult<ResourceMap> {
        self.get_json(RESOURCES_KEY).await
    }

    /// Whether a live resource map is stored.
    pub async fn has_resources(&self) -> bool {
        self.storage.has(RESOURCES_KEY).await
    }

    async fn put_json<T: serde::Serialize>(&self, key: &str, value: &T) -> SessionResult<()> {
        let value = serde_json::to_value(value).map_err(|e| {
            SessionError::Storage(StorageError::WriteFailed {
                message: e.to_string(),
            })
        })?;
        self.storage.put(key, value).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> SessionResult<T> {
        let value = self.storage.get(key).await?;
        serde_json::from_value(value).map_err(|e| corrupted(key, &e.to_string()))
    }
}

fn corrupted(key: &str, message: &str) -> SessionError {
    SessionError::Storage(StorageError::CorruptedData {
        key: key.to_string(),
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthenticationError;
    use crate::storage::{InMemoryStorage, MockStorageBackend};
    use crate::types::{StorageConfig, TtlPolicy};

    fn test_bundle() -> TokenBundle {
        TokenBundle {
            access_token: "AT1".to_string(),
            instance_url: "https://inst".to_string(),
            id: "ID1".to_string(),
            issued_at: "100".to_string(),
            signature: "SIG".to_string(),
        }
    }

    fn cipher() -> TokenCipher {
        TokenCipher::from_secret("app-key")
    }

    fn memory_cache() -> TokenCache<InMemoryStorage> {
        TokenCache::new(
            Arc::new(InMemoryStorage::new(StorageConfig::new(
                "app_",
                TtlPolicy::Timed(20),
            ))),
            cipher(),
        )
    }

    #[tokio::test]
    async fn test_token_round_trip() {
        let cache = memory_cache();
        let bundle = test_bundle();

        cache.put_token_data(&bundle).await.unwrap();

        assert!(cache.has_token().await);
        assert_eq!(cache.get_token_data().await.unwrap(), bundle);
    }

    #[tokio::test]
    async fn test_empty_cache_is_missing_key() {
        let cache = memory_cache();

        assert!(!cache.has_token().await);
        assert!(cache.get_token_data().await.unwrap_err().is_missing_key());
        assert!(cache.get_resources().await.unwrap_err().is_missing_key());
    }

    #[tokio::test]
    async fn test_incomplete_bundle_is_not_stored() {
        let storage = Arc::new(MockStorageBackend::new());
        let cache = TokenCache::new(storage.clone(), cipher());
        let mut bundle = test_bundle();
        bundle.signature.clear();

        let err = cache.put_token_data(&bundle).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Authentication(AuthenticationError::IncompleteToken { .. })
        ));
        assert!(storage.get_put_history().is_empty());
    }

    #[tokio::test]
    async fn test_resources_round_trip() {
        let cache = memory_cache();
        let mut resources = ResourceMap::new();
        resources.insert(
            "sobjects".to_string(),
            "/services/data/v50.0/sobjects".to_string(),
        );

        cache.store_resources(&resources).await.unwrap();

        assert!(cache.has_resources().await);
        assert_eq!(cache.get_resources().await.unwrap(), resources);
        assert!(!cache.has_token().await);
    }

    #[tokio::test]
    async fn test_records_are_stored_under_logical_keys() {
        let storage = Arc::new(MockStorageBackend::new());
        let cache = TokenCache::new(storage.clone(), cipher());

        cache.put_token_data(&test_bundle()).await.unwrap();
        cache.store_resources(&ResourceMap::new()).await.unwrap();

        let keys: Vec<String> = storage
            .get_put_history()
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, vec![TOKEN_KEY.to_string(), RESOURCES_KEY.to_string()]);
    }

    #[tokio::test]
    async fn test_corrupted_token_record() {
        let storage = Arc::new(MockStorageBackend::new());
        storage.add_value(TOKEN_KEY, serde_json::json!({"access_token": "AT1"}));
        let cache = TokenCache::new(storage, cipher());

        let err = cache.get_token_data().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Storage(StorageError::CorruptedData { .. })
        ));
    }

    #[tokio::test]
    async fn test_token_record_is_encrypted() {
        let storage = Arc::new(MockStorageBackend::new());
        let cache = TokenCache::new(storage.clone(), cipher());

        cache.put_token_data(&test_bundle()).await.unwrap();

        let (_, stored) = storage.get_put_history().remove(0);
        let stored = stored.as_str().unwrap().to_string();
        assert!(!stored.contains("AT1"));
        assert!(!stored.contains("https://inst"));
        assert_eq!(cache.get_token_data().await.unwrap(), test_bundle());
    }

    #[tokio::test]
    async fn test_token_sealed_with_other_key_is_corrupted() {
        let storage = Arc::new(MockStorageBackend::new());
        TokenCache::new(storage.clone(), TokenCipher::from_secret("old-key"))
            .put_token_data(&test_bundle())
            .await
            .unwrap();

        let err = TokenCache::new(storage, cipher())
            .get_token_data()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Storage(StorageError::CorruptedData { ref key, .. })
                if key == TOKEN_KEY
        ));
        assert!(err.needs_reauth());
    }

    #[tokio::test]
    async fn test_forget_token_keeps_resources() {
        let cache = memory_cache();
        cache.put_token_data(&test_bundle()).await.unwrap();
        cache.store_resources(&ResourceMap::new()).await.unwrap();

        assert!(cache.forget_token().await.unwrap());
        assert!(!cache.has_token().await);
        assert!(cache.has_resources().await);
    }
}
