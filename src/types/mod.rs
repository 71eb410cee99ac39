//! Session Types
//!
//! Configuration and token data structures.

pub mod config;
pub mod token;

pub use config::{
    effective_ttl_minutes, resolve_ttl_minutes, SessionConfig, SessionOptions, StorageConfig,
    TtlPolicy, DEFAULT_API_VERSION, DEFAULT_TIMEOUT_SECS, DEFAULT_TTL_MINUTES, REVOKE_PATH,
    TOKEN_PATH,
};
pub use token::{compute_signature, ResourceMap, TokenBundle, TokenResponse};
