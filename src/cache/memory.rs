use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;

use crate::core::traits::CacheStore;

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    expires_at: Instant,
}

/// In-memory page cache with per-entry expiry.
///
/// Expired entries are evicted lazily when read.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }
        if self
            .entries
            .remove_if(key, |_, entry| entry.expires_at <= now)
            .is_some()
        {
            log::debug!("Evicted expired cache entry {key}");
        }
        None
    }

    fn set(&self, key: &str, value: Bytes, ttl: u64) -> bool {
        if ttl == 0 {
            return false;
        }
        let Some(expires_at) = Instant::now().checked_add(Duration::from_secs(ttl)) else {
            log::warn!("Cache TTL {ttl}s for {key} is out of range, entry not stored");
            return false;
        };
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
        true
    }

    fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}
