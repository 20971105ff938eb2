//! Error types for cache operations
//!
//! A lookup of a missing or expired key is not an error; these variants cover
//! payload (de)serialization, persistence I/O, capacity and configuration
//! failures.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// The value stored under `key` could not be serialized
    #[error("Serialization error for key '{key}': {source}")]
    SerializationError {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The value stored under `key` does not match the requested type
    #[error("Deserialization error for key '{key}': {source}")]
    DeserializationError {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Reading or writing the backing directory failed
    #[error("I/O error at {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An entry file exists but does not hold a valid entry
    #[error("Corrupt cache entry at {}: {reason}", path.display())]
    CorruptEntry { path: PathBuf, reason: String },

    /// A single entry is larger than the whole cache may hold
    #[error("Entry '{key}' is {size_bytes} bytes, exceeding the cache limit of {max_size_bytes} bytes")]
    CapacityError {
        key: String,
        size_bytes: usize,
        max_size_bytes: usize,
    },

    /// The cache is at capacity and eviction is disabled
    #[error("Cache is full: cannot insert '{key}' without evicting")]
    CacheFull { key: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::IoError {
            path: path.into(),
            source,
        }
    }
}

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}
