//! Expiring key/value cache with optional capacity bound.

use chrono::{DateTime, TimeDelta, Utc};
use filings_core::{FilingsError, Result};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, instrument};

/// Free-form metadata attached to a cache entry.
pub type Metadata = BTreeMap<String, Value>;

/// A single cached value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Key the entry is stored under.
    pub key: String,
    /// Cached payload.
    pub data: T,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
    /// When the entry stops being served; `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

impl<T> CacheEntry<T> {
    /// Returns true once `now` has reached the expiry time.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Returns true if the entry has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Age of the entry.
    #[must_use]
    pub fn age(&self) -> TimeDelta {
        Utc::now().signed_duration_since(self.created_at)
    }
}

/// Expiring key/value cache.
///
/// Expired entries are masked on read but kept until [`purge_expired`](Self::purge_expired)
/// or an overwrite removes them, so a persisted cache can still serve them through
/// [`get_stale`](Self::get_stale). When `max_size` is set, each insertion that
/// exceeds it evicts the single entry with the oldest `created_at`.
#[derive(Clone, Debug)]
pub struct ExpiringCache<T> {
    name: String,
    entries: HashMap<String, CacheEntry<T>>,
    max_size: Option<usize>,
    default_ttl: Option<TimeDelta>,
}

#[derive(Serialize, Deserialize)]
struct PersistedCache<E> {
    name: String,
    entries: BTreeMap<String, E>,
    max_size: Option<usize>,
    default_ttl: Option<f64>,
}

impl<T> ExpiringCache<T> {
    /// Creates an empty, unbounded cache with no default TTL.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
            max_size: None,
            default_ttl: None,
        }
    }

    /// Sets the TTL applied when `set` is called without one.
    #[must_use]
    pub const fn with_default_ttl(mut self, ttl: TimeDelta) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Bounds the number of entries. Zero means unbounded.
    #[must_use]
    pub const fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = if max_size == 0 { None } else { Some(max_size) };
        self
    }

    /// Name of the cache.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default TTL, if any.
    #[must_use]
    pub const fn default_ttl(&self) -> Option<TimeDelta> {
        self.default_ttl
    }

    /// Returns the live (unexpired) value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&T> {
        let now = Utc::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| &entry.data)
    }

    /// Returns the value for a key even if it has expired.
    #[must_use]
    pub fn get_stale(&self, key: &str) -> Option<&T> {
        self.entries.get(key).map(|entry| &entry.data)
    }

    /// Returns the raw entry for a key, expired or not.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<&CacheEntry<T>> {
        self.entries.get(key)
    }

    /// Stores a value, replacing any previous entry under the key.
    ///
    /// `ttl` falls back to the default TTL; with neither, the entry never expires.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        data: T,
        ttl: Option<TimeDelta>,
        metadata: Option<Metadata>,
    ) {
        let key = key.into();
        let now = Utc::now();
        let expires_at = ttl.or(self.default_ttl).map(|ttl| now + ttl);
        self.entries.insert(
            key.clone(),
            CacheEntry {
                key: key.clone(),
                data,
                created_at: now,
                expires_at,
                metadata: metadata.unwrap_or_default(),
            },
        );

        if self.max_size.is_some_and(|max| self.entries.len() > max) {
            self.evict_oldest(&key);
        }
    }

    /// Removes a key. Returns true if it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Physically removes expired entries and returns how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let purged = before - self.entries.len();
        if purged > 0 {
            debug!(cache = %self.name, purged, "Purged expired cache entries");
        }
        purged
    }

    /// Number of stored entries, including expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&mut self, keep: &str) {
        let oldest = self
            .entries
            .values()
            .filter(|entry| entry.key != keep)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.key.cmp(&b.key)))
            .map(|entry| entry.key.clone());
        if let Some(key) = oldest {
            debug!(cache = %self.name, key = %key, "Evicting oldest cache entry");
            self.entries.remove(&key);
        }
    }
}

impl<T: Serialize + DeserializeOwned> ExpiringCache<T> {
    /// Writes every entry, expired ones included, to a JSON file.
    ///
    /// # Errors
    /// Returns [`FilingsError::Cache`] if serialization or the write fails.
    #[instrument(skip(self), fields(cache = %self.name, entries = self.entries.len()))]
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let persisted = PersistedCache {
            name: self.name.clone(),
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v))
                .collect(),
            max_size: self.max_size,
            default_ttl: self
                .default_ttl
                .map(|ttl| ttl.num_milliseconds() as f64 / 1000.0),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| FilingsError::Cache(e.to_string()))?;
        }
        let json =
            serde_json::to_vec_pretty(&persisted).map_err(|e| FilingsError::Cache(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| FilingsError::Cache(e.to_string()))?;
        debug!("Saved cache to {}", path.display());
        Ok(())
    }

    /// Restores a cache written by [`save_to_file`](Self::save_to_file), entries verbatim.
    ///
    /// # Errors
    /// Returns [`FilingsError::Cache`] if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| FilingsError::Cache(e.to_string()))?;
        let persisted: PersistedCache<CacheEntry<T>> =
            serde_json::from_slice(&bytes).map_err(|e| FilingsError::Cache(e.to_string()))?;
        let default_ttl = persisted
            .default_ttl
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .and_then(|secs| TimeDelta::try_milliseconds((secs * 1000.0) as i64));
        Ok(Self {
            name: persisted.name,
            entries: persisted.entries.into_iter().collect(),
            max_size: persisted.max_size.filter(|max| *max > 0),
            default_ttl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_returns_live_values() {
        let mut cache = ExpiringCache::new("test");
        cache.set("k", json!({"a": 1}), None, None);
        assert_eq!(cache.get("k"), Some(&json!({"a": 1})));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_zero_ttl_is_absent_immediately() {
        let mut cache = ExpiringCache::new("test");
        cache.set("k", 1, Some(TimeDelta::zero()), None);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.get_stale("k"), Some(&1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entry_age_counts_from_creation() {
        let mut cache = ExpiringCache::new("test");
        cache.set("k", 1, None, None);
        let age = cache.entry("k").unwrap().age();
        assert!(age >= TimeDelta::zero());
        assert!(age < TimeDelta::minutes(1));
    }

    #[test]
    fn test_no_ttl_never_expires() {
        let mut cache = ExpiringCache::new("test");
        cache.set("k", 1, None, None);
        let entry = cache.entry("k").unwrap();
        assert_eq!(entry.expires_at, None);
        assert!(!entry.is_expired_at(Utc::now() + TimeDelta::days(36_500)));
    }

    #[test]
    fn test_default_ttl_applies_when_omitted() {
        let mut cache = ExpiringCache::new("test").with_default_ttl(TimeDelta::days(7));
        cache.set("k", 1, None, None);
        let entry = cache.entry("k").unwrap();
        assert_eq!(entry.expires_at.unwrap() - entry.created_at, TimeDelta::days(7));

        cache.set("short", 2, Some(TimeDelta::hours(1)), None);
        let entry = cache.entry("short").unwrap();
        assert_eq!(entry.expires_at.unwrap() - entry.created_at, TimeDelta::hours(1));
    }

    #[test]
    fn test_eviction_removes_oldest_created() {
        let mut cache = ExpiringCache::new("test").with_max_size(2);
        cache.set("a", 1, None, None);
        cache.set("b", 2, None, None);
        // Reading does not refresh; eviction is by creation time, not use.
        assert_eq!(cache.get("a"), Some(&1));
        cache.set("c", 3, None, None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(&2));
        assert_eq!(cache.get("c"), Some(&3));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let mut cache = ExpiringCache::new("test").with_max_size(2);
        cache.set("a", 1, None, None);
        cache.set("b", 2, None, None);
        cache.set("a", 10, None, None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(&10));
        assert_eq!(cache.get("b"), Some(&2));
    }

    #[test]
    fn test_delete_clear_and_purge() {
        let mut cache = ExpiringCache::new("test");
        cache.set("live", 1, None, None);
        cache.set("dead", 2, Some(TimeDelta::zero()), None);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);

        assert!(cache.delete("live"));
        assert!(!cache.delete("live"));
        cache.set("x", 3, None, None);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_save_and_load_keep_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), json!("test"));

        let mut cache = ExpiringCache::new("submissions")
            .with_default_ttl(TimeDelta::days(1))
            .with_max_size(10);
        cache.set("fresh", json!([1, 2, 3]), None, Some(metadata.clone()));
        cache.set("stale", json!("old"), Some(TimeDelta::zero()), None);
        cache.save_to_file(&path).unwrap();

        let loaded: ExpiringCache<Value> = ExpiringCache::load_from_file(&path).unwrap();
        assert_eq!(loaded.name(), "submissions");
        assert_eq!(loaded.default_ttl(), Some(TimeDelta::days(1)));
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("fresh"), Some(&json!([1, 2, 3])));
        assert_eq!(loaded.entry("fresh").unwrap().metadata, metadata);
        assert_eq!(loaded.get("stale"), None);
        assert_eq!(loaded.get_stale("stale"), Some(&json!("old")));
    }

    #[test]
    fn test_load_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(ExpiringCache::<Value>::load_from_file(&path).is_err());
    }
}
