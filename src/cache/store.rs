//! Main cache store implementation with TTL expiry, LRU eviction and
//! optional directory persistence

use crate::cache::{
    config::CacheConfig,
    entry::CacheEntry,
    invalidation::{InvalidationEvent, InvalidationReason},
    storage::DirectoryStore,
    types::{CacheKey, CacheStats, Namespace},
};
use crate::error::{CacheError, Result};
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Expiring key-value cache for one namespace
///
/// - Thread-safe async access via RwLock; every mutation, including the
///   file write of a directory namespace, happens under the write lock
/// - Lazy TTL expiry: expired entries are dropped when read
/// - LRU eviction when the entry or byte limits are reached
/// - Write-through persistence for directory namespaces
pub struct ExpiringCache {
    /// Cache configuration
    pub(crate) config: CacheConfig,

    namespace: Namespace,

    /// Backing directory, `None` for the process-local namespace
    storage: Option<DirectoryStore>,

    state: RwLock<CacheState>,
}

/// Internal cache storage
#[derive(Default)]
struct CacheState {
    /// Main storage: key -> entry
    entries: HashMap<CacheKey, CacheEntry>,

    /// LRU tracking: front is least recently used
    lru_queue: VecDeque<CacheKey>,

    stats: CacheStats,

    /// Total size of cached data in bytes
    current_size_bytes: usize,
}

impl CacheState {
    fn upsert(&mut self, entry: CacheEntry) {
        let key = entry.key.clone();
        let size = entry.size_bytes;
        if let Some(previous) = self.entries.insert(key.clone(), entry) {
            self.current_size_bytes = self.current_size_bytes.saturating_sub(previous.size_bytes);
            self.lru_queue.retain(|k| k != &key);
        }
        self.current_size_bytes += size;
        self.lru_queue.push_back(key);
        self.sync_stats();
    }

    fn take(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru_queue.retain(|k| k != key);
        self.current_size_bytes = self.current_size_bytes.saturating_sub(entry.size_bytes);
        self.sync_stats();
        Some(entry)
    }

    fn touch(&mut self, key: &str) {
        self.lru_queue.retain(|k| k != key);
        self.lru_queue.push_back(key.to_string());
    }

    fn expired_keys(&self) -> Vec<CacheKey> {
        let now = Utc::now();
        self.entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.key.clone())
            .collect()
    }

    fn sync_stats(&mut self) {
        self.stats.entries = self.entries.len();
        self.stats.size_bytes = self.current_size_bytes;
    }
}

impl ExpiringCache {
    /// Create a process-local cache
    ///
    /// The config is taken as is. Use [`ExpiringCache::for_namespace`] or a
    /// [`CacheRegistry`](crate::cache::registry::CacheRegistry) to have it
    /// validated first.
    pub fn new(config: CacheConfig) -> Self {
        debug!("Initializing in-memory cache with config: {:?}", config);

        Self {
            config,
            namespace: Namespace::Default,
            storage: None,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Open a cache persisted under `dir`, loading any entries already there
    ///
    /// The directory is created on the first write. Entries that expired
    /// while the cache was closed are deleted during the load.
    pub async fn open(dir: impl Into<PathBuf>, config: CacheConfig) -> Result<Self> {
        config.validate().map_err(CacheError::ConfigError)?;

        let dir = dir.into();
        let storage = DirectoryStore::new(dir.clone());
        let loaded = storage.load_all().await?;

        let mut entries = loaded.entries;
        entries.sort_by_key(|entry| entry.created_at);

        let mut state = CacheState::default();
        let now = Utc::now();
        for entry in entries {
            if entry.is_expired_at(now) {
                debug!("Dropping expired entry on load: {}", entry.key);
                if let Err(e) = storage.delete(&entry.key).await {
                    warn!("Failed to delete expired entry '{}': {}", entry.key, e);
                }
                state.stats.evictions_ttl += 1;
                continue;
            }
            state.upsert(entry);
        }

        let cache = Self {
            config,
            namespace: Namespace::Directory(dir),
            storage: Some(storage),
            state: RwLock::new(state),
        };

        // The directory may hold more than the current limits allow
        {
            let mut state = cache.state.write().await;
            cache.trim_to_capacity(&mut state).await;
            info!(
                "Opened cache namespace {} ({} entries, {} skipped files)",
                cache.namespace,
                state.entries.len(),
                loaded.skipped
            );
        }

        Ok(cache)
    }

    /// Open the cache for any namespace
    pub async fn for_namespace(namespace: Namespace, config: CacheConfig) -> Result<Self> {
        match namespace {
            Namespace::Default => {
                config.validate().map_err(CacheError::ConfigError)?;
                Ok(Self::new(config))
            }
            Namespace::Directory(dir) => Self::open(dir, config).await,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store a value that never expires, replacing any previous entry
    pub async fn put<T>(&self, key: impl Into<CacheKey>, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let entry = CacheEntry::from_serializable(key.into(), value, None)?;
        self.insert_entry(entry).await
    }

    /// Store a value that expires `ttl_seconds` from now
    pub async fn put_with_ttl<T>(&self, key: impl Into<CacheKey>, value: &T, ttl_seconds: u64) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let entry = CacheEntry::from_serializable(key.into(), value, Some(ttl_seconds))?;
        self.insert_entry(entry).await
    }

    /// Insert a prepared entry
    ///
    /// On error the cache is left as it was: capacity checks run before any
    /// I/O and memory is only updated after the entry file is in place.
    pub async fn insert_entry(&self, entry: CacheEntry) -> Result<()> {
        if entry.size_bytes > self.config.max_size_bytes {
            return Err(CacheError::CapacityError {
                key: entry.key,
                size_bytes: entry.size_bytes,
                max_size_bytes: self.config.max_size_bytes,
            });
        }

        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let mut victims = self.plan_evictions(state, &entry.key, entry.size_bytes);
        if !victims.is_empty() {
            // Expired entries go before live ones
            self.purge_expired(state).await;
            victims = self.plan_evictions(state, &entry.key, entry.size_bytes);
        }

        if !victims.is_empty() && !self.config.enable_lru_eviction {
            return Err(CacheError::CacheFull { key: entry.key });
        }

        if let Some(storage) = &self.storage {
            storage.write(&entry).await?;
        }

        for (key, reason) in victims {
            debug!("Evicting entry ({}): {}", reason, key);
            self.discard(state, &key).await;
            state.stats.evictions_size += 1;
        }

        if state.entries.contains_key(&entry.key) {
            debug!("Updating existing cache entry: {}", entry.key);
        } else {
            debug!("Inserting new cache entry: {}", entry.key);
        }
        state.upsert(entry);

        Ok(())
    }

    /// Get a value, `None` if absent or expired
    ///
    /// Reading an expired entry removes it.
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let expired = match state.entries.get(key) {
            None => {
                debug!("Cache miss: {}", key);
                state.stats.misses += 1;
                return Ok(None);
            }
            Some(entry) => entry.is_expired(),
        };

        if expired {
            debug!("Cache entry expired: {}", key);
            state.stats.misses += 1;
            state.stats.evictions_ttl += 1;
            self.discard(state, key).await;
            return Ok(None);
        }

        let value = match state.entries.get_mut(key) {
            Some(entry) => {
                let value = entry.decode::<T>()?;
                entry.mark_accessed();
                value
            }
            None => return Ok(None),
        };

        state.stats.hits += 1;
        if self.config.enable_lru_eviction {
            state.touch(key);
        }

        debug!("Cache hit: {}", key);
        Ok(Some(value))
    }

    /// Check for a live entry without touching stats or recency
    pub async fn contains_key(&self, key: &str) -> bool {
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Time left before `key` expires; `None` if absent, expired or never expiring
    pub async fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let state = self.state.read().await;
        state.entries.get(key)?.time_until_expiration()
    }

    /// Live keys, least recently used first
    pub async fn keys(&self) -> Vec<CacheKey> {
        let state = self.state.read().await;
        let now = Utc::now();
        state
            .lru_queue
            .iter()
            .filter(|key| {
                state
                    .entries
                    .get(key.as_str())
                    .is_some_and(|entry| !entry.is_expired_at(now))
            })
            .cloned()
            .collect()
    }

    /// Remove a specific entry; returns whether it was present
    ///
    /// If the entry file cannot be deleted the entry stays cached.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let mut state = self.state.write().await;

        let on_disk = match &self.storage {
            Some(storage) => storage.delete(key).await?,
            None => false,
        };

        let in_memory = state.take(key).is_some();
        if in_memory {
            state.stats.invalidations += 1;
            debug!("Removed cache entry: {}", key);
        }

        Ok(in_memory || on_disk)
    }

    /// Clear all entries from the cache
    ///
    /// Entry files are deleted one key at a time. If a deletion fails, the
    /// keys whose files are already gone are dropped from memory and the rest
    /// stay cached, so memory keeps matching the directory.
    pub async fn clear(&self) -> Result<usize> {
        let mut state = self.state.write().await;

        if let Some(storage) = &self.storage {
            let keys: Vec<CacheKey> = state.lru_queue.iter().cloned().collect();
            let mut deleted: Vec<CacheKey> = Vec::with_capacity(keys.len());

            for key in keys {
                if let Err(e) = storage.delete(&key).await {
                    for key in &deleted {
                        state.take(key);
                    }
                    state.stats.invalidations += deleted.len() as u64;
                    warn!(
                        "Clear of {} stopped after {} entries: {}",
                        self.namespace,
                        deleted.len(),
                        e
                    );
                    return Err(e);
                }
                deleted.push(key);
            }

            // Entry files with no live entry, e.g. left by another process
            let orphans = storage.clear().await?;
            if orphans > 0 {
                debug!("Removed {} orphaned entry files from {}", orphans, self.namespace);
            }
        }

        let count = state.entries.len();
        state.entries.clear();
        state.lru_queue.clear();
        state.current_size_bytes = 0;
        state.stats.invalidations += count as u64;
        state.sync_stats();

        info!("Cleared {} entries from cache namespace {}", count, self.namespace);
        Ok(count)
    }

    /// Remove all expired entries
    pub async fn cleanup_expired(&self) -> Result<Vec<InvalidationEvent>> {
        let mut state = self.state.write().await;
        let expired_keys = self.purge_expired(&mut state).await;

        let mut events = Vec::new();
        if !expired_keys.is_empty() {
            debug!("Cleaned up {} expired entries", expired_keys.len());
            let count = expired_keys.len();
            events.push(
                InvalidationEvent::new(InvalidationReason::Expired, expired_keys)
                    .with_context(format!("Cleaned up {} expired entries", count)),
            );
        }

        Ok(events)
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        state.stats.clone()
    }

    /// Get current cache size in bytes
    pub async fn size_bytes(&self) -> usize {
        let state = self.state.read().await;
        state.current_size_bytes
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        state.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        let state = self.state.read().await;
        state.entries.is_empty()
    }

    /// Internal: drop an entry from memory and disk
    ///
    /// Used for expiry and eviction, where the entry is gone from the
    /// caller's point of view even if its file lingers.
    async fn discard(&self, state: &mut CacheState, key: &str) {
        state.take(key);
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.delete(key).await {
                warn!("Failed to delete entry file for '{}': {}", key, e);
            }
        }
    }

    /// Internal: drop every expired entry, returning their keys
    async fn purge_expired(&self, state: &mut CacheState) -> Vec<CacheKey> {
        let expired_keys = state.expired_keys();
        for key in &expired_keys {
            self.discard(state, key).await;
        }
        state.stats.evictions_ttl += expired_keys.len() as u64;
        expired_keys
    }

    /// Internal: LRU victims needed to fit `size` bytes under `key`
    fn plan_evictions(
        &self,
        state: &CacheState,
        key: &str,
        size: usize,
    ) -> Vec<(CacheKey, InvalidationReason)> {
        let replaced = state.entries.get(key).map(|entry| entry.size_bytes);
        let mut count = state.entries.len() + usize::from(replaced.is_none());
        let mut bytes = state.current_size_bytes - replaced.unwrap_or(0) + size;

        let mut victims = Vec::new();
        for candidate in &state.lru_queue {
            let over_count = count > self.config.max_entries;
            let over_size = bytes > self.config.max_size_bytes;
            if !over_count && !over_size {
                break;
            }
            if candidate == key {
                continue;
            }
            if let Some(entry) = state.entries.get(candidate) {
                count -= 1;
                bytes -= entry.size_bytes;
                let reason = if over_count {
                    InvalidationReason::LeastRecentlyUsed
                } else {
                    InvalidationReason::SizeLimit
                };
                victims.push((candidate.clone(), reason));
            }
        }

        victims
    }

    /// Internal: evict LRU entries until the limits hold
    async fn trim_to_capacity(&self, state: &mut CacheState) {
        while state.entries.len() > self.config.max_entries
            || state.current_size_bytes > self.config.max_size_bytes
        {
            let Some(key) = state.lru_queue.front().cloned() else {
                break;
            };
            debug!("Evicting entry to fit capacity: {}", key);
            self.discard(state, &key).await;
            state.stats.evictions_size += 1;
        }
    }
}

/// Background task for automatic cache cleanup
pub async fn start_auto_cleanup(cache: Arc<ExpiringCache>) {
    let interval = cache.config.cleanup_interval;

    info!(
        "Starting automatic cache cleanup for {} (interval: {:?})",
        cache.namespace, interval
    );

    loop {
        tokio::time::sleep(interval).await;

        match cache.cleanup_expired().await {
            Ok(events) => {
                if !events.is_empty() {
                    debug!("Auto cleanup: {} events", events.len());
                }
            }
            Err(e) => {
                warn!("Auto cleanup failed: {}", e);
            }
        }
    }
}
