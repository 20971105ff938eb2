//! # Expiring Key-Value Cache
//!
//! Values of any serializable type are stored under string keys, either in a
//! process-local namespace or in a namespace persisted under a directory.
//!
//! ## Features
//!
//! - **Optional TTL**: entries either never expire or expire a whole number of
//!   seconds after insertion; expired entries are never returned
//! - **Lazy eviction**: reading an expired entry removes it, and
//!   [`ExpiringCache::cleanup_expired`] sweeps the rest
//! - **Directory persistence**: one JSON file per key, written atomically, so
//!   entries survive a restart
//! - **Capacity limits**: entry count and byte size, with LRU eviction
//! - **Shared namespaces**: a [`CacheRegistry`] hands out one instance per
//!   namespace
//!
//! ## Example
//!
//! ```rust
//! use expiring_kv::cache::{CacheConfig, CacheRegistry};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = CacheRegistry::new(CacheConfig::default())?;
//! let cache = registry.default_cache().await?;
//!
//! cache.put("greeting", "hello").await?;
//! cache.put_with_ttl("session", &42u32, 5).await?;
//!
//! if let Some(value) = cache.get::<String>("greeting").await? {
//!     println!("Cache hit: {}", value);
//! }
//!
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod invalidation;
pub mod registry;
pub mod storage;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use entry::CacheEntry;
pub use invalidation::{InvalidationEvent, InvalidationReason};
pub use registry::CacheRegistry;
pub use storage::{DirectoryStore, LoadedEntries};
pub use store::{start_auto_cleanup, ExpiringCache};
pub use types::{CacheKey, CacheStats, CacheValue, Namespace};
