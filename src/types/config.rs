//! Configuration Types
//!
//! Session configuration, storage expiration policy and optional knobs.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::warn;

use crate::token::TokenCipher;

/// Minutes an entry lives when the configured TTL is missing or invalid.
pub const DEFAULT_TTL_MINUTES: u32 = 20;
/// Default REST API version used for resource discovery.
pub const DEFAULT_API_VERSION: &str = "50.0";
/// Default HTTP timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Token endpoint path appended to the login URL.
pub const TOKEN_PATH: &str = "/services/oauth2/token";
/// Revoke endpoint path appended to the login URL.
pub const REVOKE_PATH: &str = "/services/oauth2/revoke";

/// Session configuration.
///
/// Loaded once at session construction and never mutated afterwards.
#[derive(Clone)]
pub struct SessionConfig {
    /// Base login endpoint, without trailing slash.
    pub login_url: String,
    /// Connected app client id.
    pub consumer_key: String,
    /// Connected app client secret.
    pub consumer_secret: SecretString,
    /// Resource owner username.
    pub username: String,
    /// Resource owner password.
    pub password: SecretString,
    /// Prefix applied to every storage key.
    pub storage_namespace: String,
    /// Raw TTL in minutes; non-positive or absent resolves to the default.
    pub ttl_minutes: Option<i64>,
    /// Ignore TTL and keep entries until overwritten or deleted.
    pub store_forever: bool,
    /// Secret the token record is encrypted with; the consumer secret when unset.
    pub encryption_key: Option<SecretString>,
}

impl SessionConfig {
    /// Token endpoint URL.
    pub fn token_url(&self) -> String {
        format!("{}{}", self.login_url, TOKEN_PATH)
    }

    /// Revoke endpoint URL.
    pub fn revoke_url(&self) -> String {
        format!("{}{}", self.login_url, REVOKE_PATH)
    }

    /// Password grant form parameters, in wire order.
    pub fn password_grant_params(&self) -> [(&str, &str); 5] {
        [
            ("grant_type", "password"),
            ("client_id", self.consumer_key.as_str()),
            ("client_secret", self.consumer_secret.expose_secret().as_str()),
            ("username", self.username.as_str()),
            ("password", self.password.expose_secret().as_str()),
        ]
    }

    /// Storage settings derived from this configuration.
    pub fn storage(&self) -> StorageConfig {
        StorageConfig {
            namespace: self.storage_namespace.clone(),
            ttl: TtlPolicy::new(self.ttl_minutes, self.store_forever),
        }
    }

    /// Cipher for the token record at rest.
    pub fn token_cipher(&self) -> TokenCipher {
        let secret = self
            .encryption_key
            .as_ref()
            .unwrap_or(&self.consumer_secret);
        TokenCipher::from_secret(secret.expose_secret())
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("login_url", &self.login_url)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("storage_namespace", &self.storage_namespace)
            .field("ttl_minutes", &self.ttl_minutes)
            .field("store_forever", &self.store_forever)
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Expiration policy applied to every `put`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TtlPolicy {
    /// Entries survive until overwritten or deleted.
    Forever,
    /// Entries become unreadable after this many minutes.
    Timed(u32),
}

impl TtlPolicy {
    /// Resolve the policy; `store_forever` overrides any TTL.
    pub fn new(ttl_minutes: Option<i64>, store_forever: bool) -> Self {
        if store_forever {
            return Self::Forever;
        }
        Self::Timed(effective_ttl_minutes(ttl_minutes))
    }

    /// Lifetime of a freshly written entry, `None` for forever.
    pub fn duration(&self) -> Option<chrono::Duration> {
        match self {
            Self::Forever => None,
            Self::Timed(minutes) => Some(chrono::Duration::minutes(i64::from(*minutes))),
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::Timed(DEFAULT_TTL_MINUTES)
    }
}

/// Storage namespace plus expiration policy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageConfig {
    pub namespace: String,
    pub ttl: TtlPolicy,
}

impl StorageConfig {
    pub fn new(namespace: impl Into<String>, ttl: TtlPolicy) -> Self {
        Self {
            namespace: namespace.into(),
            ttl,
        }
    }

    /// Physical key for a logical key.
    pub fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }
}

/// Positive values win; anything else falls back to [`DEFAULT_TTL_MINUTES`].
pub fn effective_ttl_minutes(ttl_minutes: Option<i64>) -> u32 {
    match ttl_minutes.map(u32::try_from) {
        Some(Ok(minutes)) if minutes > 0 => minutes,
        None => DEFAULT_TTL_MINUTES,
        Some(_) => {
            warn!(
                ttl_minutes = ?ttl_minutes,
                default = DEFAULT_TTL_MINUTES,
                "Configured TTL is not a positive integer, using default"
            );
            DEFAULT_TTL_MINUTES
        }
    }
}

/// Resolve a TTL from a raw config value such as an environment variable.
pub fn resolve_ttl_minutes(raw: Option<&str>) -> u32 {
    let Some(raw) = raw else {
        return DEFAULT_TTL_MINUTES;
    };

    match parse_strict_int(raw) {
        Some(minutes) => effective_ttl_minutes(Some(minutes)),
        None => {
            warn!(
                raw = raw,
                default = DEFAULT_TTL_MINUTES,
                "Configured TTL is not an integer, using default"
            );
            DEFAULT_TTL_MINUTES
        }
    }
}

/// Optional sign followed by digits, no leading zeros except a lone `0`.
fn parse_strict_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix(&['+', '-'][..]).unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    trimmed.parse().ok()
}

/// Session knobs outside the credential set.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// REST API version used to discover resources, e.g. "50.0".
    pub api_version: String,
    /// Per-request timeout handed to the transport.
    pub timeout: Duration,
    /// Reject token responses whose signature does not match.
    pub verify_signature: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            verify_signature: false,
        }
    }
}
