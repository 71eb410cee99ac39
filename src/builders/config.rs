//! Configuration Builder
//!
//! Fluent builder for session configuration, plus environment loading.

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::{ConfigurationError, SessionError, SessionResult};
use crate::types::{resolve_ttl_minutes, SessionConfig};

/// Environment variable names read by [`SessionConfigBuilder::from_env`].
pub mod env {
    pub const LOGIN_URL: &str = "OAUTH2_LOGIN_URL";
    pub const CONSUMER_KEY: &str = "OAUTH2_CONSUMER_KEY";
    pub const CONSUMER_SECRET: &str = "OAUTH2_CONSUMER_SECRET";
    pub const USERNAME: &str = "OAUTH2_USERNAME";
    pub const PASSWORD: &str = "OAUTH2_PASSWORD";
    pub const STORAGE_PATH: &str = "OAUTH2_STORAGE_PATH";
    pub const STORAGE_EXPIRE_IN: &str = "OAUTH2_STORAGE_EXPIRE_IN";
    pub const STORAGE_STORE_FOREVER: &str = "OAUTH2_STORAGE_STORE_FOREVER";
    pub const ENCRYPTION_KEY: &str = "OAUTH2_ENCRYPTION_KEY";
}

/// Session configuration builder.
#[derive(Default)]
pub struct SessionConfigBuilder {
    login_url: Option<String>,
    consumer_key: Option<String>,
    consumer_secret: Option<SecretString>,
    username: Option<String>,
    password: Option<SecretString>,
    storage_namespace: String,
    ttl_minutes: Option<i64>,
    store_forever: bool,
    encryption_key: Option<SecretString>,
}

impl SessionConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a builder from `OAUTH2_*` environment variables.
    ///
    /// Missing credentials are reported by [`build`](Self::build), so values
    /// can still be supplied programmatically afterwards.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Seed a builder from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::new();
        builder.login_url = lookup(env::LOGIN_URL);
        builder.consumer_key = lookup(env::CONSUMER_KEY);
        builder.consumer_secret = lookup(env::CONSUMER_SECRET).map(SecretString::new);
        builder.username = lookup(env::USERNAME);
        builder.password = lookup(env::PASSWORD).map(SecretString::new);
        builder.storage_namespace = lookup(env::STORAGE_PATH).unwrap_or_default();
        builder.ttl_minutes = lookup(env::STORAGE_EXPIRE_IN)
            .map(|raw| i64::from(resolve_ttl_minutes(Some(&raw))));
        builder.store_forever = lookup(env::STORAGE_STORE_FOREVER)
            .map(|raw| parse_flag(&raw))
            .unwrap_or(false);
        builder.encryption_key = lookup(env::ENCRYPTION_KEY).map(SecretString::new);
        builder
    }

    /// Set login URL.
    pub fn login_url(mut self, login_url: impl Into<String>) -> Self {
        self.login_url = Some(login_url.into());
        self
    }

    /// Set consumer key (client id).
    pub fn consumer_key(mut self, consumer_key: impl Into<String>) -> Self {
        self.consumer_key = Some(consumer_key.into());
        self
    }

    /// Set consumer secret (client secret).
    pub fn consumer_secret(mut self, consumer_secret: impl Into<String>) -> Self {
        self.consumer_secret = Some(SecretString::new(consumer_secret.into()));
        self
    }

    /// Set username.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::new(password.into()));
        self
    }

    /// Set storage key prefix.
    pub fn storage_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.storage_namespace = namespace.into();
        self
    }

    /// Set storage TTL in minutes.
    pub fn ttl_minutes(mut self, minutes: i64) -> Self {
        self.ttl_minutes = Some(minutes);
        self
    }

    /// Keep stored entries until overwritten or deleted.
    pub fn store_forever(mut self, store_forever: bool) -> Self {
        self.store_forever = store_forever;
        self
    }

    /// Set the secret used to encrypt the stored token.
    pub fn encryption_key(mut self, encryption_key: impl Into<String>) -> Self {
        self.encryption_key = Some(SecretString::new(encryption_key.into()));
        self
    }

    /// Build the configuration.
    pub fn build(self) -> SessionResult<SessionConfig> {
        let login_url = required(self.login_url, "login_url")?;
        let login_url = login_url.trim_end_matches('/').to_string();
        if Url::parse(&login_url).is_err() {
            return Err(SessionError::Configuration(
                ConfigurationError::InvalidLoginUrl { url: login_url },
            ));
        }

        if let Some(key) = &self.encryption_key {
            if key.expose_secret().is_empty() {
                return Err(SessionError::Configuration(
                    ConfigurationError::InvalidConfig {
                        message: "encryption_key must not be empty".to_string(),
                    },
                ));
            }
        }

        Ok(SessionConfig {
            login_url,
            consumer_key: required(self.consumer_key, "consumer_key")?,
            consumer_secret: required(self.consumer_secret, "consumer_secret")?,
            username: required(self.username, "username")?,
            password: required(self.password, "password")?,
            storage_namespace: self.storage_namespace,
            ttl_minutes: self.ttl_minutes,
            store_forever: self.store_forever,
            encryption_key: self.encryption_key,
        })
    }
}

impl SessionConfig {
    /// Load configuration from `OAUTH2_*` environment variables.
    pub fn from_env() -> SessionResult<Self> {
        SessionConfigBuilder::from_env().build()
    }
}

fn required<T>(value: Option<T>, field: &str) -> SessionResult<T> {
    value.ok_or_else(|| {
        SessionError::Configuration(ConfigurationError::MissingRequired {
            field: field.to_string(),
        })
    })
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Create a new session configuration builder.
pub fn session_config() -> SessionConfigBuilder {
    SessionConfigBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TtlPolicy, DEFAULT_TTL_MINUTES};
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn complete_builder() -> SessionConfigBuilder {
        session_config()
            .login_url("https://example.com/")
            .consumer_key("k")
            .consumer_secret("s")
            .username("u")
            .password("p")
    }

    #[test]
    fn test_builder_success() {
        let config = complete_builder()
            .storage_namespace("forrest_")
            .ttl_minutes(60)
            .build()
            .unwrap();

        assert_eq!(config.login_url, "https://example.com");
        assert_eq!(config.consumer_key, "k");
        assert_eq!(config.password.expose_secret(), "p");
        assert_eq!(config.storage().ttl, TtlPolicy::Timed(60));
    }

    #[test]
    fn test_builder_missing_password() {
        let result = session_config()
            .login_url("https://example.com")
            .consumer_key("k")
            .consumer_secret("s")
            .username("u")
            .build();

        assert!(matches!(
            result,
            Err(SessionError::Configuration(ConfigurationError::MissingRequired { ref field }))
                if field == "password"
        ));
    }

    #[test]
    fn test_builder_rejects_unparseable_login_url() {
        let result = complete_builder().login_url("not a url").build();
        assert!(matches!(
            result,
            Err(SessionError::Configuration(ConfigurationError::InvalidLoginUrl { .. }))
        ));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (env::LOGIN_URL, "https://login.example.com"),
            (env::CONSUMER_KEY, "key"),
            (env::CONSUMER_SECRET, "secret"),
            (env::USERNAME, "user@example.com"),
            (env::PASSWORD, "pw"),
            (env::STORAGE_PATH, "app_"),
            (env::STORAGE_EXPIRE_IN, "90"),
            (env::STORAGE_STORE_FOREVER, "false"),
        ]
        .into_iter()
        .collect();

        let config = SessionConfigBuilder::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
            .build()
            .unwrap();

        assert_eq!(config.username, "user@example.com");
        assert_eq!(config.storage_namespace, "app_");
        assert_eq!(config.storage().ttl, TtlPolicy::Timed(90));
    }

    #[test]
    fn test_from_lookup_invalid_ttl_and_forever_flag() {
        let vars: HashMap<&str, &str> = [
            (env::STORAGE_EXPIRE_IN, "soon"),
            (env::STORAGE_STORE_FOREVER, "TRUE"),
        ]
        .into_iter()
        .collect();

        let builder = SessionConfigBuilder::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(builder.ttl_minutes, Some(i64::from(DEFAULT_TTL_MINUTES)));
        assert!(builder.store_forever);

        // Credentials can still be added after env seeding.
        let config = builder
            .login_url("https://example.com")
            .consumer_key("k")
            .consumer_secret("s")
            .username("u")
            .password("p")
            .build()
            .unwrap();
        assert_eq!(config.storage().ttl, TtlPolicy::Forever);
    }

    #[test]
    fn test_empty_encryption_key_is_rejected() {
        let result = complete_builder().encryption_key("").build();
        assert!(matches!(
            result,
            Err(SessionError::Configuration(ConfigurationError::InvalidConfig { .. }))
        ));
    }

    #[test]
    fn test_encryption_key_from_lookup() {
        let vars: HashMap<&str, &str> = [(env::ENCRYPTION_KEY, "base64:app-key")]
            .into_iter()
            .collect();

        let config = SessionConfigBuilder::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
            .login_url("https://example.com")
            .consumer_key("k")
            .consumer_secret("s")
            .username("u")
            .password("p")
            .build()
            .unwrap();

        assert_eq!(
            config.encryption_key.as_ref().map(|k| k.expose_secret().as_str()),
            Some("base64:app-key")
        );
        assert!(!format!("{:?}", config).contains("app-key"));
    }
}
