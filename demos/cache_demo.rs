//! Cache Demo Application
//!
//! Stores a value, reads it back, stores a value with a one second TTL,
//! persists a value under a directory and checks the TTL entry from a
//! background task once it has expired.
//!
//! Usage:
//!   cargo run --example cache_demo
//!
//! Environment variables (a `.env` file is honored):
//!   CACHE_DIR                   - directory namespace (default: ./Cache)
//!   CACHE_MAX_ENTRIES           - entry limit per namespace
//!   CACHE_MAX_SIZE_BYTES        - byte limit per namespace
//!   CACHE_AUTO_CLEANUP          - sweep expired entries periodically
//!   CACHE_CLEANUP_INTERVAL_SECS - sweep interval
//!   RUST_LOG                    - log filter (default: info)

use chrono::Utc;
use expiring_kv::CacheRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize, Deserialize)]
struct CacheVo {
    name: String,
    time: i64,
}

impl CacheVo {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            time: Utc::now().timestamp_millis(),
        }
    }
}

impl fmt::Display for CacheVo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name: {}, time: {}", self.name, self.time)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("=== Expiring Cache Demo ===");

    let registry = Arc::new(CacheRegistry::from_env()?);
    let cache_dir = std::env::var("CACHE_DIR").unwrap_or_else(|_| "Cache".to_string());

    let cache = registry.default_cache().await?;

    let vo = CacheVo::new("persistence test");
    info!("Before save: {}", vo);
    cache.put("ctv", &vo).await?;

    if let Some(ctv) = cache.get::<CacheVo>("ctv").await? {
        info!("After save: {}", ctv);
    }

    // Valid for one second
    cache.put_with_ttl("ctva", &CacheVo::new("expiry test"), 1).await?;

    // Persisted under a directory
    let dir_cache = registry.directory(&cache_dir).await?;
    dir_cache.put("key", "saved data").await?;
    info!("Saved 'key' under {}", dir_cache.namespace());

    let checker = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            // 1.5s later the entry has expired
            tokio::time::sleep(Duration::from_millis(1500)).await;
            let cache = registry.default_cache().await?;
            let ctva = cache.get::<CacheVo>("ctva").await?;
            info!("Expired: {}", ctva.is_none());
            Ok::<_, expiring_kv::CacheError>(())
        })
    };
    checker.await??;

    info!("Default namespace: {}", cache.stats().await);
    info!("Directory namespace: {}", dir_cache.stats().await);

    Ok(())
}
