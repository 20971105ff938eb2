//! Configuration for the cache system

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Configuration shared by every namespace of a registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries per namespace
    pub max_entries: usize,

    /// Maximum total payload size per namespace in bytes
    pub max_size_bytes: usize,

    /// Spawn a periodic sweep of expired entries for each namespace
    pub enable_auto_cleanup: bool,

    /// Interval for automatic cleanup checks
    pub cleanup_interval: Duration,

    /// Enable LRU eviction policy
    /// When false, inserts into a full cache fail instead of evicting
    pub enable_lru_eviction: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            // 50 MB, the classic ASimpleCache ceiling
            max_size_bytes: 50 * 1024 * 1024,
            enable_auto_cleanup: false,
            // Cleanup every 5 minutes
            cleanup_interval: Duration::from_secs(300),
            enable_lru_eviction: true,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_entries == 0 {
            return Err("max_entries must be greater than 0".to_string());
        }

        if self.max_size_bytes == 0 {
            return Err("max_size_bytes must be greater than 0".to_string());
        }

        if self.enable_auto_cleanup && self.cleanup_interval.is_zero() {
            return Err("cleanup_interval must be non-zero when auto cleanup is enabled".to_string());
        }

        Ok(())
    }

    /// Load configuration from the environment (and a `.env` file if present)
    ///
    /// Recognized variables: `CACHE_MAX_ENTRIES`, `CACHE_MAX_SIZE_BYTES`,
    /// `CACHE_AUTO_CLEANUP`, `CACHE_CLEANUP_INTERVAL_SECS`. Unset variables
    /// keep their defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(max) = parse_var::<usize>(&lookup, "CACHE_MAX_ENTRIES")? {
            builder = builder.max_entries(max);
        }
        if let Some(size) = parse_var::<usize>(&lookup, "CACHE_MAX_SIZE_BYTES")? {
            builder = builder.max_size_bytes(size);
        }
        if let Some(enable) = parse_var::<bool>(&lookup, "CACHE_AUTO_CLEANUP")? {
            builder = builder.enable_auto_cleanup(enable);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "CACHE_CLEANUP_INTERVAL_SECS")? {
            builder = builder.cleanup_interval(Duration::from_secs(secs));
        }

        let config = builder.build();
        config.validate().map_err(CacheError::ConfigError)?;
        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CacheError::ConfigError(format!("invalid {}='{}': {}", name, raw, e))),
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    max_entries: Option<usize>,
    max_size_bytes: Option<usize>,
    enable_auto_cleanup: Option<bool>,
    cleanup_interval: Option<Duration>,
    enable_lru_eviction: Option<bool>,
}

impl CacheConfigBuilder {
    /// Set maximum number of cache entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Set maximum cache size in bytes
    pub fn max_size_bytes(mut self, size: usize) -> Self {
        self.max_size_bytes = Some(size);
        self
    }

    /// Enable or disable automatic cleanup
    pub fn enable_auto_cleanup(mut self, enable: bool) -> Self {
        self.enable_auto_cleanup = Some(enable);
        self
    }

    /// Set cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Enable or disable LRU eviction
    pub fn enable_lru_eviction(mut self, enable: bool) -> Self {
        self.enable_lru_eviction = Some(enable);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            max_entries: self.max_entries.unwrap_or(defaults.max_entries),
            max_size_bytes: self.max_size_bytes.unwrap_or(defaults.max_size_bytes),
            enable_auto_cleanup: self
                .enable_auto_cleanup
                .unwrap_or(defaults.enable_auto_cleanup),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
            enable_lru_eviction: self
                .enable_lru_eviction
                .unwrap_or(defaults.enable_lru_eviction),
        }
    }
}

/// Preset configurations for common use cases
impl CacheConfig {
    /// Configuration for memory-constrained environments
    pub fn small() -> Self {
        Self {
            max_entries: 1_000,
            max_size_bytes: 10 * 1024 * 1024, // 10 MB
            ..Default::default()
        }
    }

    /// Configuration for large caches with periodic sweeping
    pub fn large() -> Self {
        Self {
            max_entries: 1_000_000,
            max_size_bytes: 1024 * 1024 * 1024, // 1 GB
            enable_auto_cleanup: true,
            cleanup_interval: Duration::from_secs(60),
            ..Default::default()
        }
    }
}
