//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Cache key type
pub type CacheKey = String;

/// Cache value type - every payload is held as a JSON document
pub type CacheValue = serde_json::Value;

/// An isolated keyspace for cache entries
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    /// Process-local namespace, lost when the process exits
    Default,

    /// Namespace persisted under a directory
    Directory(PathBuf),
}

impl Namespace {
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Namespace::Directory(path.into())
    }

    /// Backing directory, if the namespace is persistent
    pub fn path(&self) -> Option<&Path> {
        match self {
            Namespace::Default => None,
            Namespace::Directory(path) => Some(path),
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, Namespace::Directory(_))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Default => write!(f, "default"),
            Namespace::Directory(path) => write!(f, "dir:{}", path.display()),
        }
    }
}

/// Statistics and metrics for cache performance monitoring
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses (absent or expired)
    pub misses: u64,

    /// Number of entries currently in cache
    pub entries: usize,

    /// Total size of cached payloads in bytes
    pub size_bytes: usize,

    /// Number of evictions due to capacity limits
    pub evictions_size: u64,

    /// Number of evictions due to TTL expiration
    pub evictions_ttl: u64,

    /// Number of explicit removals and clears
    pub invalidations: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }

    pub fn total_evictions(&self) -> u64 {
        self.evictions_size + self.evictions_ttl
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, entries: {}, size: {} bytes, evictions: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.entries,
            self.size_bytes,
            self.total_evictions()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };

        assert_eq!(stats.hit_rate(), 80.0);
        assert_eq!(stats.miss_rate(), 20.0);
    }

    #[test]
    fn test_cache_stats_zero_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.miss_rate(), 100.0);
    }

    #[test]
    fn test_cache_stats_display() {
        let stats = CacheStats {
            hits: 100,
            misses: 50,
            entries: 75,
            size_bytes: 1024,
            evictions_size: 10,
            evictions_ttl: 5,
            invalidations: 3,
        };

        let display = format!("{}", stats);
        assert!(display.contains("hits: 100"));
        assert!(display.contains("misses: 50"));
        assert!(display.contains("evictions: 15"));
    }

    #[test]
    fn test_namespace() {
        assert!(!Namespace::Default.is_persistent());
        assert_eq!(Namespace::Default.path(), None);

        let ns = Namespace::directory("/tmp/Cache");
        assert!(ns.is_persistent());
        assert_eq!(ns.path(), Some(Path::new("/tmp/Cache")));
        assert_eq!(ns.to_string(), "dir:/tmp/Cache");
        assert_eq!(Namespace::Default.to_string(), "default");
    }
}
