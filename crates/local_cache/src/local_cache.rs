use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use cache::{Cache, CacheEntry, CacheStats, Clock, DEFAULT_TTL, Lookup, SystemClock, sanitize_key};
use serde_json::Value;

const ENTRY_SUFFIX: &str = ".json";

/// File-per-key cache. Each entry lives in `<dir>/<sanitized key>.json` as
/// `{"value", "created_at", "expires_at"}`.
///
/// There is no locking: two processes writing the same key race and the
/// last write wins, which is harmless since every value can be fetched
/// again from its source.
pub struct LocalCache {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl LocalCache {
    pub fn new<P: AsRef<Path>>(path: P, ttl: Option<Duration>) -> Result<Self> {
        Self::with_clock(path, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock<P: AsRef<Path>>(
        path: P,
        ttl: Option<Duration>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        fs::create_dir_all(path.as_ref())
            .with_context(|| format!("creating cache directory {}", path.as_ref().display()))?;

        Ok(LocalCache {
            dir: path.as_ref().to_path_buf(),
            clock,
            ttl: ttl.unwrap_or(DEFAULT_TTL),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", sanitize_key(key), ENTRY_SUFFIX))
    }

    /// Matches on the file name rather than `Path::extension`, which is
    /// `None` for `.json`, the file written for the empty key.
    fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for item in fs::read_dir(&self.dir)? {
            let path = item?.path();
            let is_entry = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(ENTRY_SUFFIX));
            if is_entry && path.is_file() {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn lookup(&self, key: &str) -> Result<Lookup<Value>> {
        let path = self.entry_path(key);
        let entry = match read_entry(&path) {
            Ok(entry) => entry,
            Err(err) if is_not_found(&err) => return Ok(Lookup::Miss),
            Err(err) => return Err(err),
        };

        if entry.is_expired(self.clock.now()) {
            if let Err(err) = remove_file(&path) {
                log::warn!("Failed to evict expired cache entry {}: {}", key, err);
            }
            return Ok(Lookup::Expired);
        }

        Ok(Lookup::Hit(entry.value))
    }

    fn write(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(value, self.clock.now(), ttl)?;
        let content = serde_json::to_vec(&entry)?;
        fs::write(self.entry_path(key), content)?;
        Ok(())
    }

    fn remove_all(&self) -> Result<()> {
        for path in self.entry_files()? {
            if let Err(err) = remove_file(&path) {
                log::warn!("Failed to remove cache file {}: {}", path.display(), err);
            }
        }
        Ok(())
    }

    fn scan(&self) -> Result<CacheStats> {
        let now = self.clock.now();
        let mut stats = CacheStats::default();

        for path in self.entry_files()? {
            let size = fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0);
            let expired = match read_entry(&path) {
                Ok(entry) => entry.is_expired(now),
                Err(_) => true,
            };
            stats.record(size, expired);
        }

        Ok(stats)
    }
}

impl Cache for LocalCache {
    fn get(&self, key: &str) -> Option<Value> {
        match self.lookup(key) {
            Ok(lookup) => lookup.into_option(),
            Err(err) => {
                log::warn!("Error reading cache for {}: {:#}", key, err);
                None
            }
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> bool {
        match self.write(key, value, ttl.unwrap_or(self.ttl)) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Error saving cache for {}: {:#}", key, err);
                false
            }
        }
    }

    fn delete(&self, key: &str) -> bool {
        match remove_file(&self.entry_path(key)) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Error deleting cache for {}: {}", key, err);
                false
            }
        }
    }

    fn clear_all(&self) -> bool {
        match self.remove_all() {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Error clearing cache: {:#}", err);
                false
            }
        }
    }

    fn stats(&self) -> Option<CacheStats> {
        match self.scan() {
            Ok(stats) => Some(stats),
            Err(err) => {
                log::warn!("Error collecting cache stats: {:#}", err);
                None
            }
        }
    }
}

fn read_entry(path: &Path) -> Result<CacheEntry<Value>> {
    let content = fs::read(path)?;
    Ok(serde_json::from_slice(&content)?)
}

/// Removes `path`, treating an already missing file as removed.
fn remove_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|err| err.kind() == io::ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache::ManualClock;
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (TempDir, LocalCache, Arc<ManualClock>) {
        let dir = tempfile::tempdir().unwrap();
        let start = NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let cache = LocalCache::with_clock(dir.path(), None, clock.clone()).unwrap();
        (dir, cache, clock)
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("cache");

        let cache = LocalCache::new(&nested, None).unwrap();

        assert!(nested.is_dir());
        assert_eq!(cache.dir(), nested.as_path());
    }

    #[test]
    fn weather_entry_round_trip_and_expiry() {
        let (_dir, cache, clock) = setup();

        assert!(cache.set(
            "weather_Austin_metric",
            json!({"temp": 21.5}),
            Some(Duration::from_secs(1800))
        ));
        assert_eq!(cache.get("weather_Austin_metric"), Some(json!({"temp": 21.5})));

        clock.advance(Duration::from_secs(1801));

        assert_eq!(cache.get("weather_Austin_metric"), None);
        assert_eq!(cache.stats().unwrap().total_files, 0);
    }

    #[test]
    fn expired_entry_is_evicted_from_disk_on_read() {
        let (dir, cache, clock) = setup();
        cache.set("k", json!(1), Some(Duration::from_secs(5)));
        let path = dir.path().join("k.json");
        assert!(path.exists());

        clock.advance(Duration::from_secs(6));
        assert!(cache.get("k").is_none());
        assert!(!path.exists());
    }

    #[test]
    fn on_disk_record_shape() {
        let (dir, cache, _) = setup();
        cache.set("news/es:rust", json!(["a", "b"]), Some(Duration::from_secs(60)));

        let raw = fs::read_to_string(dir.path().join("news_es_rust.json")).unwrap();
        let record: Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(record["value"], json!(["a", "b"]));
        assert_eq!(record["created_at"], json!("2025-03-03T20:00:00"));
        assert_eq!(record["expires_at"], json!("2025-03-03T20:01:00"));
    }

    #[test]
    fn reads_entries_in_legacy_format() {
        let (dir, cache, _) = setup();
        fs::write(
            dir.path().join("legacy.json"),
            r#"{"value": {"ok": true}, "expiry": "2025-03-03T21:00:00.000001", "created": "2025-03-03T19:00:00"}"#,
        )
        .unwrap();

        assert_eq!(cache.get("legacy"), Some(json!({"ok": true})));
    }

    #[test]
    fn corrupt_entry_is_a_miss_and_counts_as_expired() {
        let (dir, cache, _) = setup();
        cache.set("good", json!("fine"), None);
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        assert_eq!(cache.get("broken"), None);
        assert!(dir.path().join("broken.json").exists());

        let stats = cache.stats().unwrap();
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.expired_files, 1);
        assert_eq!(stats.active_files, 1);
    }

    #[test]
    fn stats_ignore_foreign_files_and_never_evict() {
        let (dir, cache, clock) = setup();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        cache.set("a", json!(1), Some(Duration::from_secs(10)));
        cache.set("b", json!(2), Some(Duration::from_secs(100)));
        clock.advance(Duration::from_secs(50));

        let stats = cache.stats().unwrap();
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.expired_files, 1);
        assert_eq!(stats.total_files, stats.active_files + stats.expired_files);
        assert!(stats.total_size_bytes > 0);
        assert!(dir.path().join("a.json").exists());
    }

    #[test]
    fn delete_is_idempotent() {
        let (_dir, cache, _) = setup();
        cache.set("k", json!(1), None);

        assert!(cache.delete("k"));
        assert!(cache.delete("k"));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn clear_all_removes_only_entries() {
        let (dir, cache, _) = setup();
        cache.set("a", json!(1), None);
        cache.set("b", json!(2), None);
        fs::write(dir.path().join("keep.txt"), "x").unwrap();

        assert!(cache.clear_all());
        assert_eq!(cache.stats().unwrap().total_files, 0);
        assert!(dir.path().join("keep.txt").exists());
    }

    #[test]
    fn empty_key_is_counted_and_cleared() {
        let (dir, cache, _) = setup();
        assert!(cache.set("", json!({"a": 1}), None));
        assert!(dir.path().join(".json").exists());

        assert_eq!(cache.stats().unwrap().total_files, 1);

        assert!(cache.clear_all());
        assert_eq!(cache.get(""), None);
        assert_eq!(cache.stats().unwrap().total_files, 0);
    }

    #[test]
    fn overwrite_resets_expiry() {
        let (_dir, cache, clock) = setup();
        cache.set("k", json!("old"), Some(Duration::from_secs(10)));
        clock.advance(Duration::from_secs(8));
        cache.set("k", json!("new"), Some(Duration::from_secs(10)));
        clock.advance(Duration::from_secs(8));

        assert_eq!(cache.get("k"), Some(json!("new")));
    }

    #[test]
    fn missing_directory_degrades_without_panicking() {
        let (dir, cache, _) = setup();
        let path = dir.path().to_path_buf();
        drop(dir);
        assert!(!path.exists());

        assert!(!cache.set("k", json!(1), None));
        assert_eq!(cache.get("k"), None);
        assert!(cache.delete("k"));
        assert!(!cache.clear_all());
        assert_eq!(cache.stats(), None);
    }
}
