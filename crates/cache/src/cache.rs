mod clock;
mod memory_cache;

use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::NaiveDateTime;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::memory_cache::MemoryCache;

/// Expiry applied by `set` when the caller does not pass one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CacheEntry<T> {
    pub value: T,
    #[serde(alias = "created")]
    pub created_at: NaiveDateTime,
    #[serde(alias = "expiry")]
    pub expires_at: NaiveDateTime,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, now: NaiveDateTime, ttl: Duration) -> Result<Self> {
        let ttl = chrono::Duration::from_std(ttl)?;
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| anyhow!("expiry out of range for ttl {:?}", ttl))?;

        Ok(Self {
            value,
            created_at: now,
            expires_at,
        })
    }

    /// An entry stays active up to and including `expires_at`.
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        now > self.expires_at
    }
}

/// Outcome of a backend read before it is collapsed to `Option`.
#[derive(Debug, PartialEq)]
pub enum Lookup<T> {
    Hit(T),
    Miss,
    Expired,
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss | Lookup::Expired => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct CacheStats {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub expired_files: usize,
    pub active_files: usize,
}

impl CacheStats {
    pub fn record(&mut self, size_bytes: u64, expired: bool) {
        self.total_files += 1;
        self.total_size_bytes += size_bytes;
        if expired {
            self.expired_files += 1;
        } else {
            self.active_files += 1;
        }
    }
}

/// Maps a caller key onto a storage identifier.
///
/// Only `/` and `:` are rewritten, so `a/b`, `a:b` and `a_b` all share one
/// slot. Entries already on disk depend on this mapping.
pub fn sanitize_key(key: &str) -> String {
    key.replace(['/', ':'], "_")
}

/// Best-effort key/value store with per-entry expiry.
///
/// No method reports failure beyond `false` / `None`: callers must keep
/// working, only slower, when the backing store is unavailable. Concurrent
/// writers to one key race and the last write wins.
pub trait Cache: Send + Sync {
    /// Returns the stored value, evicting it instead when it has expired.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` for `ttl`, or for the cache's default when `None`.
    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> bool;

    /// Succeeds whether or not the key existed.
    fn delete(&self, key: &str) -> bool;

    fn clear_all(&self) -> bool;

    /// Scans every entry without evicting anything. `None` when the store
    /// cannot be enumerated at all.
    fn stats(&self) -> Option<CacheStats>;
}

pub trait CacheExt: Cache {
    /// Typed read; a value that no longer matches `T` counts as a miss.
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("Cached value for {} has an unexpected shape: {}", key, err);
                None
            }
        }
    }

    fn set_as<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value, ttl),
            Err(err) => {
                log::warn!("Failed to serialize cache value for {}: {}", key, err);
                false
            }
        }
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}
