//! # expiring-kv
//!
//! A key-value cache with optional per-entry time-to-live and optional
//! directory persistence.
//!
//! ## Namespaces
//!
//! Every cache instance serves one namespace: the process-local default
//! namespace, or a namespace rooted at a directory. Directory namespaces keep
//! one file per key and survive process restarts.
//!
//! ```no_run
//! use expiring_kv::{CacheConfig, CacheRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = CacheRegistry::new(CacheConfig::default())?;
//!
//!     let cache = registry.directory("/sdcard/Cache").await?;
//!     cache.put("key", "saved data").await?;
//!
//!     let value: Option<String> = cache.get("key").await?;
//!     println!("Restored: {:?}", value);
//!     Ok(())
//! }
//! ```
//!
//! ## Expiry
//!
//! An entry stored with a TTL is expired once more than `ttl_seconds` have
//! elapsed since it was written. Expired entries read as absent, and the read
//! removes them.
//!
//! ```no_run
//! use expiring_kv::{CacheConfig, ExpiringCache};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = ExpiringCache::new(CacheConfig::default());
//!
//!     cache.put_with_ttl("ctva", "expires soon", 1).await?;
//!     tokio::time::sleep(Duration::from_millis(1500)).await;
//!
//!     assert!(cache.get::<String>("ctva").await?.is_none());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;

// Re-export main types for convenience
pub use cache::{
    CacheConfig, CacheConfigBuilder, CacheEntry, CacheKey, CacheRegistry, CacheStats,
    CacheValue, DirectoryStore, ExpiringCache, InvalidationEvent, InvalidationReason, Namespace,
};
pub use error::{CacheError, Result};
