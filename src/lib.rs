//! OAuth2 Password Session
//!
//! Credential lifecycle for the OAuth2 resource owner password credentials
//! grant, with pluggable, expiring token storage.
//!
//! # Features
//!
//! - Password grant authentication (RFC 6749 Section 4.3)
//! - Refresh by re-submitting the credential set
//! - Token revocation, decoupled from local cache invalidation
//! - Token bundle encrypted at rest with AES-256-GCM
//! - Storage backends with TTL or "store forever" policy and key namespacing
//! - Resource map discovery after authentication
//! - Optional HMAC-SHA256 verification of the token response signature
//!
//! # Example
//!
//! ```rust,ignore
//! use oauth2_password_session::{session_config, DefaultAuthSession, SessionOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = session_config()
//!         .login_url("https://login.example.com")
//!         .consumer_key("consumer-key")
//!         .consumer_secret("consumer-secret")
//!         .username("user@example.com")
//!         .password("password")
//!         .storage_namespace("app_")
//!         .ttl_minutes(60)
//!         .build()?;
//!
//!     let mut session = DefaultAuthSession::with_defaults(config, SessionOptions::default())?;
//!     session.authenticate().await?;
//!
//!     match session.token_data().await {
//!         Ok(token) => println!("Instance: {}", token.instance_url),
//!         Err(e) if e.needs_reauth() => {
//!             session.authenticate().await?;
//!         }
//!         Err(e) => return Err(e.into()),
//!     }
//!
//!     session.revoke().await?;
//!     session.cache().forget_token().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: configuration, TTL policy and token data structures
//! - `builders`: fluent and environment-driven configuration
//! - `core`: HTTP transport collaborator
//! - `storage`: key/value backends with expiration
//! - `token`: typed cache over a storage backend
//! - `resources`: resource map discovery
//! - `session`: the authenticate/refresh/revoke state machine

pub mod builders;
pub mod core;
pub mod error;
pub mod resources;
pub mod session;
pub mod storage;
pub mod token;
pub mod types;

// Re-export main session
pub use session::{AuthSession, DefaultAuthSession, SessionState};

// Re-export builders
pub use builders::{session_config, SessionConfigBuilder};

// Re-export errors
pub use error::{
    create_error_from_response, map_token_error, parse_error_response, AuthenticationError,
    ConfigurationError, NetworkError, OAuth2ErrorResponse, ProtocolError, SessionError,
    SessionResult, StorageError,
};

// Re-export types
pub use types::{
    compute_signature, effective_ttl_minutes, resolve_ttl_minutes, ResourceMap, SessionConfig,
    SessionOptions, StorageConfig, TokenBundle, TokenResponse, TtlPolicy, DEFAULT_TTL_MINUTES,
};

// Re-export core components
pub use crate::core::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport, ReqwestHttpTransport,
};

// Re-export storage
pub use storage::{
    FileStorage, InMemoryStorage, MockStorageBackend, StorageBackend, StoredEntry,
};

// Re-export token cache
pub use token::{TokenCache, TokenCipher, RESOURCES_KEY, TOKEN_KEY};

// Re-export resource directory
pub use resources::{HttpResourceDirectory, MockResourceDirectory, ResourceDirectory};
