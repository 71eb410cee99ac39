//! Token Cipher
//!
//! AES-256-GCM sealing of the token record before it reaches storage.

use base64::Engine;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{SessionError, SessionResult, StorageError};

/// Symmetric cipher for values at rest.
///
/// Sealed output is base64 of `nonce || ciphertext || tag`, with a fresh
/// random nonce per call.
#[derive(Clone)]
pub struct TokenCipher {
    key: [u8; 32],
    rng: SystemRandom,
}

impl TokenCipher {
    /// Derive the AES-256 key as SHA-256 of `secret`.
    pub fn from_secret(secret: &str) -> Self {
        let mut key = [0u8; 32];
        key.copy_from_slice(digest::digest(&digest::SHA256, secret.as_bytes()).as_ref());
        Self {
            key,
            rng: SystemRandom::new(),
        }
    }

    fn sealing_key(&self) -> Option<LessSafeKey> {
        UnboundKey::new(&AES_256_GCM, &self.key)
            .ok()
            .map(LessSafeKey::new)
    }

    /// Encrypt `plaintext` for the logical storage `key`.
    pub fn seal(&self, key: &str, plaintext: &[u8]) -> SessionResult<String> {
        let write_failed = |message: &str| {
            SessionError::Storage(StorageError::WriteFailed {
                message: format!("Failed to encrypt {}: {}", key, message),
            })
        };

        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| write_failed("nonce generation failed"))?;

        let sealing_key = self
            .sealing_key()
            .ok_or_else(|| write_failed("invalid key"))?;

        let mut in_out = plaintext.to_vec();
        sealing_key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(key.as_bytes()),
                &mut in_out,
            )
            .map_err(|_| write_failed("sealing failed"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(base64::engine::general_purpose::STANDARD.encode(sealed))
    }

    /// Decrypt a value produced by [`seal`](Self::seal) for the same `key`.
    ///
    /// Tampered data, a wrong secret or a value sealed for another key all
    /// surface as `CorruptedData`.
    pub fn open(&self, key: &str, sealed: &str) -> SessionResult<Vec<u8>> {
        let corrupted = |message: &str| {
            SessionError::Storage(StorageError::CorruptedData {
                key: key.to_string(),
                message: message.to_string(),
            })
        };

        let raw = base64::engine::general_purpose::STANDARD
            .decode(sealed)
            .map_err(|e| corrupted(&e.to_string()))?;
        if raw.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(corrupted("sealed value too short"));
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| corrupted("invalid nonce"))?;

        let sealing_key = self.sealing_key().ok_or_else(|| corrupted("invalid key"))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = sealing_key
            .open_in_place(nonce, Aad::from(key.as_bytes()), &mut in_out)
            .map_err(|_| corrupted("decryption failed"))?;
        Ok(plaintext.to_vec())
    }
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_then_open() {
        let cipher = TokenCipher::from_secret("app-key");
        let sealed = cipher.seal("token", b"{\"access_token\":\"AT1\"}").unwrap();

        assert!(!sealed.contains("AT1"));
        assert_eq!(
            cipher.open("token", &sealed).unwrap(),
            b"{\"access_token\":\"AT1\"}".to_vec()
        );
    }

    #[test]
    fn test_nonce_differs_per_seal() {
        let cipher = TokenCipher::from_secret("app-key");
        let a = cipher.seal("token", b"same").unwrap();
        let b = cipher.seal("token", b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_secret_is_corrupted_data() {
        let sealed = TokenCipher::from_secret("one").seal("token", b"x").unwrap();
        let err = TokenCipher::from_secret("two")
            .open("token", &sealed)
            .unwrap_err();

        assert!(matches!(
            err,
            SessionError::Storage(StorageError::CorruptedData { .. })
        ));
        assert!(err.needs_reauth());
    }

    #[test]
    fn test_value_is_bound_to_its_key() {
        let cipher = TokenCipher::from_secret("app-key");
        let sealed = cipher.seal("token", b"x").unwrap();
        assert!(cipher.open("resources", &sealed).is_err());
    }

    #[test]
    fn test_garbage_is_corrupted_data() {
        let cipher = TokenCipher::from_secret("app-key");
        assert!(cipher.open("token", "not base64!").is_err());
        assert!(cipher.open("token", "AAAA").is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", TokenCipher::from_secret("app-key"));
        assert!(debug.contains("REDACTED"));
    }
}
