//! Cache entry management with TTL support

use crate::cache::types::{CacheKey, CacheValue};
use crate::error::{CacheError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached value with its insertion time and optional TTL
///
/// Only `key`, `value`, `created_at` and `ttl_seconds` are persisted; the
/// access bookkeeping lives in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cache key
    pub key: CacheKey,

    /// The cached value
    pub value: CacheValue,

    /// When the entry was inserted
    pub created_at: DateTime<Utc>,

    /// Seconds after `created_at` at which the entry expires; `None` never expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,

    /// Last access time
    #[serde(skip)]
    pub accessed_at: Option<DateTime<Utc>>,

    /// Number of hits served from this entry
    #[serde(skip)]
    pub access_count: u64,

    /// Approximate size of the entry in bytes
    #[serde(skip)]
    pub size_bytes: usize,
}

impl CacheEntry {
    /// Create an entry that never expires
    pub fn new(key: CacheKey, value: CacheValue) -> Self {
        Self::build(key, value, None)
    }

    /// Create an entry that expires `ttl_seconds` after now
    pub fn with_ttl(key: CacheKey, value: CacheValue, ttl_seconds: u64) -> Self {
        Self::build(key, value, Some(ttl_seconds))
    }

    /// Serialize `value` into a new entry, naming `key` on failure
    pub fn from_serializable<T>(key: CacheKey, value: &T, ttl_seconds: Option<u64>) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value).map_err(|source| CacheError::SerializationError {
            key: key.clone(),
            source,
        })?;
        Ok(Self::build(key, value, ttl_seconds))
    }

    fn build(key: CacheKey, value: CacheValue, ttl_seconds: Option<u64>) -> Self {
        let mut entry = Self {
            key,
            value,
            created_at: Utc::now(),
            ttl_seconds,
            accessed_at: None,
            access_count: 0,
            size_bytes: 0,
        };
        entry.size_bytes = entry.calculate_size();
        entry
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Expired iff a TTL is set and strictly more than `ttl_seconds` have
    /// elapsed since insertion
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.ttl_seconds {
            None => false,
            Some(ttl) => {
                let elapsed_ms = now.signed_duration_since(self.created_at).num_milliseconds();
                i128::from(elapsed_ms) > i128::from(ttl) * 1000
            }
        }
    }

    /// Get time until expiration, `None` if already expired or never expiring
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let ttl = self.ttl_seconds?;
        let remaining = Duration::from_secs(ttl).checked_sub(self.age())?;
        if self.is_expired() {
            None
        } else {
            Some(remaining)
        }
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        (Utc::now() - self.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }

    /// Mark the entry as accessed (updates access time and count)
    pub fn mark_accessed(&mut self) {
        self.accessed_at = Some(Utc::now());
        self.access_count += 1;
    }

    /// Decode the stored value into `T`
    pub fn decode<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        T::deserialize(&self.value).map_err(|source| CacheError::DeserializationError {
            key: self.key.clone(),
            source,
        })
    }

    /// Calculate the size of this entry in bytes
    pub fn calculate_size(&self) -> usize {
        // key + encoded value; `Value` always encodes
        let value_len = serde_json::to_vec(&self.value).map(|v| v.len()).unwrap_or(0);
        self.key.len() + value_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;

    #[test]
    fn test_cache_entry_creation() {
        let entry = CacheEntry::new("test_key".to_string(), json!("test_value"));

        assert_eq!(entry.key, "test_key");
        assert_eq!(entry.value, json!("test_value"));
        assert_eq!(entry.ttl_seconds, None);
        assert!(!entry.is_expired());
        assert!(entry.time_until_expiration().is_none());
    }

    #[test]
    fn test_entry_expiration_boundary() {
        let entry = CacheEntry::with_ttl("test".to_string(), json!(1), 1);
        let created = entry.created_at;

        assert!(!entry.is_expired_at(created));
        assert!(!entry.is_expired_at(created + chrono::Duration::seconds(1)));
        assert!(entry.is_expired_at(created + chrono::Duration::milliseconds(1001)));
    }

    #[test]
    fn test_zero_ttl_expires_after_any_delay() {
        let entry = CacheEntry::with_ttl("test".to_string(), json!(1), 0);
        assert!(!entry.is_expired_at(entry.created_at));
        sleep(Duration::from_millis(5));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let entry = CacheEntry::with_ttl("test".to_string(), json!(1), u64::MAX);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_never_expiring_entry() {
        let mut entry = CacheEntry::new("test".to_string(), json!(1));
        entry.created_at = Utc::now() - chrono::Duration::days(3650);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_mark_accessed() {
        let mut entry = CacheEntry::new("test".to_string(), json!("value"));
        assert!(entry.accessed_at.is_none());

        entry.mark_accessed();
        entry.mark_accessed();

        assert_eq!(entry.access_count, 2);
        assert!(entry.accessed_at.is_some());
    }

    #[test]
    fn test_time_until_expiration() {
        let entry = CacheEntry::with_ttl("test".to_string(), json!("value"), 3600);

        let time_left = entry.time_until_expiration();
        assert!(time_left.is_some());
        assert!(time_left.unwrap() <= Duration::from_secs(3600));
    }

    #[test]
    fn test_from_serializable_and_decode() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct CacheVo {
            name: String,
            time: i64,
        }

        let vo = CacheVo {
            name: "persisted".to_string(),
            time: 42,
        };
        let entry = CacheEntry::from_serializable("ctv".to_string(), &vo, None).unwrap();
        assert_eq!(entry.decode::<CacheVo>().unwrap(), vo);

        let err = entry.decode::<Vec<u8>>().unwrap_err();
        assert!(matches!(err, CacheError::DeserializationError { ref key, .. } if key == "ctv"));
    }

    #[test]
    fn test_unserializable_value_names_key() {
        use std::collections::HashMap;

        // JSON object keys must be strings
        let mut map = HashMap::new();
        map.insert(vec![1u8, 2], "x");

        let err = CacheEntry::from_serializable("bad".to_string(), &map, None).unwrap_err();
        assert!(matches!(err, CacheError::SerializationError { ref key, .. } if key == "bad"));
    }

    #[test]
    fn test_persisted_form_skips_access_bookkeeping() {
        let mut entry = CacheEntry::with_ttl("k".to_string(), json!({"a": 1}), 5);
        entry.mark_accessed();

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"ttl_seconds\":5"));
        assert!(!json.contains("access_count"));

        let restored: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.access_count, 0);
        assert_eq!(restored.created_at, entry.created_at);
    }

    #[test]
    fn test_calculate_size() {
        let entry = CacheEntry::new("key".to_string(), json!("value"));
        assert_eq!(entry.size_bytes, entry.calculate_size());
        assert!(entry.size_bytes >= "key".len() + "value".len());
    }
}
