//! Token Persistence
//!
//! Typed cache for the token bundle and resource map, with the token
//! encrypted at rest.

pub mod cache;
pub mod cipher;

pub use cache::{TokenCache, RESOURCES_KEY, TOKEN_KEY};
pub use cipher::TokenCipher;
