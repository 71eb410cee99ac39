//! Storage
//!
//! Pluggable persistence for the token bundle and resource map.
//!
//! This module provides:
//!
//! - **StorageBackend**: the key/value contract with expiration
//! - **InMemoryStorage**: process-local backend
//! - **FileStorage**: JSON files on disk, shareable between processes
//! - **MockStorageBackend**: recording backend for tests

pub mod backend;
pub mod file;
pub mod memory;

pub use backend::{missing_key, StorageBackend, StoredEntry};
pub use file::FileStorage;
pub use memory::{InMemoryStorage, MockStorageBackend};
