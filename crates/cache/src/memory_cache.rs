use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use serde_json::Value;

use crate::{Cache, CacheEntry, CacheStats, Clock, DEFAULT_TTL, Lookup, SystemClock, sanitize_key};

/// Process-local cache with the same expiry and key rules as the file cache.
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry<Value>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Option<Duration>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            ttl: ttl.unwrap_or(DEFAULT_TTL),
        }
    }

    fn lookup(&self, key: &str) -> Lookup<Value> {
        let key = sanitize_key(key);
        let now = self.clock.now();

        match self.entries.get(&key) {
            None => return Lookup::Miss,
            Some(entry) if !entry.is_expired(now) => return Lookup::Hit(entry.value.clone()),
            Some(_) => {}
        }

        self.entries.remove_if(&key, |_, entry| entry.is_expired(now));
        Lookup::Expired
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.lookup(key).into_option()
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> bool {
        match CacheEntry::new(value, self.clock.now(), ttl.unwrap_or(self.ttl)) {
            Ok(entry) => {
                self.entries.insert(sanitize_key(key), entry);
                true
            }
            Err(err) => {
                log::warn!("Failed to store cache entry for {}: {}", key, err);
                false
            }
        }
    }

    fn delete(&self, key: &str) -> bool {
        self.entries.remove(&sanitize_key(key));
        true
    }

    fn clear_all(&self) -> bool {
        self.entries.clear();
        true
    }

    fn stats(&self) -> Option<CacheStats> {
        let now = self.clock.now();
        let mut stats = CacheStats::default();

        for entry in self.entries.iter() {
            let size = serde_json::to_vec(entry.value())
                .map(|bytes| bytes.len() as u64)
                .unwrap_or(0);
            stats.record(size, entry.is_expired(now));
        }

        Some(stats)
    }
}
