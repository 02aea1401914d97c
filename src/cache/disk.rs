//! Disk cache implementation with per-entry TTL support.
//!
//! Entries are stored as a serialized envelope carrying the value and an
//! optional absolute expiry. Expiry is enforced lazily on read, so a read
//! after the TTL elapses is indistinguishable from a key that was never set.
//!
//! Negative results are a caller convention: storing an `Option<T>` value of
//! `None` produces a present entry whose payload is JSON `null`, distinct
//! from an absent key. This is what lets the IMDb resolver remember
//! "looked up, nothing found" separately from "never looked up".

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::CacheError;

/// Current wall-clock time as float unix seconds.
///
/// Float seconds are used everywhere expiry timestamps appear so that sync
/// records stay wire-compatible between instances.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: Option<f64>, // Unix timestamp in float seconds
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => unix_now() >= exp,
            None => false,
        }
    }
}

/// Persistent key-value cache with optional per-entry expiry.
pub struct DiskCache {
    db: sled::Db,
}

impl DiskCache {
    /// Opens (or creates) a cache rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        let db = sled::open(dir).map_err(|e| CacheError::Open(e.to_string()))?;
        Ok(Self { db })
    }

    /// Get a value. Expired entries report as absent and are removed.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        Ok(self.get_with_expiry(key)?.map(|(value, _)| value))
    }

    /// Get a value together with its expiry timestamp, if any.
    ///
    /// Expired entries still report as absent; the expiry is only exposed for
    /// live entries so that callers (sync export, merge) can compare
    /// freshness.
    pub fn get_with_expiry<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<(T, Option<f64>)>, CacheError> {
        let bytes = self
            .db
            .get(key)
            .map_err(|e| CacheError::Operation(e.to_string()))?;

        if let Some(bytes) = bytes
            && let Ok(entry) = serde_json::from_slice::<CacheEntry>(&bytes)
        {
            if !entry.is_expired() {
                let value = decode(entry.value)?;
                return Ok(Some((value, entry.expires_at)));
            }
            // Entry expired, remove it
            let _ = self.db.remove(key);
        }
        Ok(None)
    }

    /// Set a value with an optional TTL in seconds. `None` never expires.
    pub fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: Option<f64>,
    ) -> Result<(), CacheError> {
        let expires_at = ttl_seconds.map(|ttl| unix_now() + ttl);
        self.set_at(key, value, expires_at)
    }

    /// Set a value with an absolute expiry timestamp. Used by the sync merge
    /// path, which receives absolute expiries from peers.
    pub fn set_at<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        expires_at: Option<f64>,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value: serde_json::to_value(value)
                .map_err(|e| CacheError::Serialization(e.to_string()))?,
            expires_at,
        };
        let bytes =
            serde_json::to_vec(&entry).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.db
            .insert(key, bytes)
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        Ok(())
    }

    /// Enumerate every record with its expiry, including already-expired
    /// ones. The sync exporter decides what to skip, not the cache.
    pub fn entries<T: DeserializeOwned>(
        &self,
    ) -> Result<Vec<(String, T, Option<f64>)>, CacheError> {
        let mut out = Vec::new();
        for kv in self.db.iter() {
            let (key, bytes) = kv.map_err(|e| CacheError::Operation(e.to_string()))?;
            let entry: CacheEntry = serde_json::from_slice(&bytes)
                .map_err(|e| CacheError::Serialization(e.to_string()))?;
            out.push((
                String::from_utf8_lossy(&key).into_owned(),
                decode(entry.value)?,
                entry.expires_at,
            ));
        }
        Ok(out)
    }

    /// Number of stored records, expired or not.
    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, CacheError> {
    serde_json::from_value(value).map_err(|e| CacheError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_cache() -> DiskCache {
        let dir = tempdir().unwrap();
        DiskCache::open(dir.path().join("cache")).unwrap()
    }

    #[test]
    fn test_get_set() {
        let cache = test_cache();
        cache.set("key", &"value".to_string(), None).unwrap();
        assert_eq!(
            cache.get::<String>("key").unwrap(),
            Some("value".to_string())
        );
    }

    #[test]
    fn test_missing_key_is_absent() {
        let cache = test_cache();
        assert_eq!(cache.get::<String>("nope").unwrap(), None);
    }

    #[test]
    fn test_ttl_expiration() {
        let cache = test_cache();
        cache.set("key", &"value".to_string(), Some(0.05)).unwrap();
        assert_eq!(
            cache.get::<String>("key").unwrap(),
            Some("value".to_string())
        );
        std::thread::sleep(std::time::Duration::from_millis(100));
        assert_eq!(cache.get::<String>("key").unwrap(), None);
    }

    #[test]
    fn test_already_expired_entry_is_absent() {
        let cache = test_cache();
        cache
            .set_at("key", &"value".to_string(), Some(unix_now() - 1.0))
            .unwrap();
        assert_eq!(cache.get::<String>("key").unwrap(), None);
    }

    #[test]
    fn test_permanent_entry_survives() {
        let cache = test_cache();
        cache.set("key", &"value".to_string(), None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));
        let (value, expires_at) = cache.get_with_expiry::<String>("key").unwrap().unwrap();
        assert_eq!(value, "value");
        assert_eq!(expires_at, None);
    }

    #[test]
    fn test_negative_entry_is_distinct_from_absent() {
        let cache = test_cache();
        cache
            .set::<Option<String>>("looked-up", &None, Some(3600.0))
            .unwrap();
        // Present entry with a null payload
        assert_eq!(
            cache.get::<Option<String>>("looked-up").unwrap(),
            Some(None)
        );
        // Never-looked-up key
        assert_eq!(cache.get::<Option<String>>("never").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites() {
        let cache = test_cache();
        cache.set("key", &"v1".to_string(), Some(3600.0)).unwrap();
        cache.set("key", &"v2".to_string(), None).unwrap();
        let (value, expires_at) = cache.get_with_expiry::<String>("key").unwrap().unwrap();
        assert_eq!(value, "v2");
        assert_eq!(expires_at, None);
    }

    #[test]
    fn test_entries_include_expired() {
        let cache = test_cache();
        cache.set("live", &"a".to_string(), None).unwrap();
        cache
            .set_at("dead", &"b".to_string(), Some(unix_now() - 10.0))
            .unwrap();
        let entries = cache.entries::<String>().unwrap();
        assert_eq!(entries.len(), 2);
        let dead = entries.iter().find(|(k, _, _)| k == "dead").unwrap();
        assert!(dead.2.unwrap() < unix_now());
        assert_eq!(cache.len(), 2);
    }
}
