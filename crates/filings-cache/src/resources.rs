//! Per-resource cache set.

use chrono::TimeDelta;
use filings_core::{CacheTtls, Result};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::expiring::ExpiringCache;

/// Upstream resource types, each cached independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Ticker directory.
    Directory,
    /// Company submission histories.
    Submissions,
    /// Company facts.
    Facts,
    /// Single concepts.
    Concept,
}

impl ResourceKind {
    /// All resource kinds.
    pub const ALL: [Self; 4] = [Self::Directory, Self::Submissions, Self::Facts, Self::Concept];

    /// Name of the cache instance.
    #[must_use]
    pub const fn cache_name(&self) -> &'static str {
        match self {
            Self::Directory => "company_tickers",
            Self::Submissions => "submissions",
            Self::Facts => "company_facts",
            Self::Concept => "company_concept",
        }
    }

    /// File the cache is persisted to.
    #[must_use]
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::Directory => "company_tickers_cache.json",
            Self::Submissions => "submissions_cache.json",
            Self::Facts => "company_facts_cache.json",
            Self::Concept => "company_concept_cache.json",
        }
    }

    const fn ttl(&self, ttls: &CacheTtls) -> TimeDelta {
        match self {
            Self::Directory => ttls.directory,
            Self::Submissions => ttls.submissions,
            Self::Facts => ttls.facts,
            Self::Concept => ttls.concept,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cache_name())
    }
}

/// The four upstream caches, persisted under one directory.
#[derive(Debug)]
pub struct ResourceCaches {
    dir: PathBuf,
    directory: ExpiringCache<Value>,
    submissions: ExpiringCache<Value>,
    facts: ExpiringCache<Value>,
    concept: ExpiringCache<Value>,
}

impl ResourceCaches {
    /// Loads every cache from `dir`.
    ///
    /// A missing or unreadable file starts that cache empty. The configured TTLs
    /// replace whatever default was persisted.
    #[must_use]
    pub fn load(dir: impl Into<PathBuf>, ttls: &CacheTtls) -> Self {
        let dir = dir.into();
        let load = |kind: ResourceKind| -> ExpiringCache<Value> {
            let fresh = || ExpiringCache::new(kind.cache_name()).with_default_ttl(kind.ttl(ttls));
            let path = dir.join(kind.file_name());
            if !path.exists() {
                debug!(cache = %kind, "No persisted cache, starting empty");
                return fresh();
            }
            match ExpiringCache::<Value>::load_from_file(&path) {
                Ok(cache) => {
                    debug!(cache = %kind, entries = cache.len(), "Loaded persisted cache");
                    cache.with_default_ttl(kind.ttl(ttls))
                }
                Err(e) => {
                    warn!(cache = %kind, error = %e, "Discarding unreadable cache file");
                    fresh()
                }
            }
        };

        Self {
            directory: load(ResourceKind::Directory),
            submissions: load(ResourceKind::Submissions),
            facts: load(ResourceKind::Facts),
            concept: load(ResourceKind::Concept),
            dir,
        }
    }

    /// Directory the caches persist to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the cache for a resource kind.
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> &ExpiringCache<Value> {
        match kind {
            ResourceKind::Directory => &self.directory,
            ResourceKind::Submissions => &self.submissions,
            ResourceKind::Facts => &self.facts,
            ResourceKind::Concept => &self.concept,
        }
    }

    /// Returns the cache for a resource kind, mutably.
    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut ExpiringCache<Value> {
        match kind {
            ResourceKind::Directory => &mut self.directory,
            ResourceKind::Submissions => &mut self.submissions,
            ResourceKind::Facts => &mut self.facts,
            ResourceKind::Concept => &mut self.concept,
        }
    }

    /// Writes all four caches to disk.
    ///
    /// # Errors
    /// Returns [`FilingsError::Cache`](filings_core::FilingsError::Cache) on the first
    /// cache that fails to save.
    pub fn save(&self) -> Result<()> {
        for kind in ResourceKind::ALL {
            self.get(kind).save_to_file(&self.dir.join(kind.file_name()))?;
        }
        Ok(())
    }

    /// Clears all four caches in memory.
    pub fn clear(&mut self) {
        for kind in ResourceKind::ALL {
            self.get_mut(kind).clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_directory_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let caches = ResourceCaches::load(dir.path().join("absent"), &CacheTtls::default());
        assert_eq!(caches.dir(), dir.path().join("absent"));
        for kind in ResourceKind::ALL {
            assert!(caches.get(kind).is_empty());
        }
        assert_eq!(
            caches.get(ResourceKind::Directory).default_ttl(),
            Some(TimeDelta::days(7))
        );
        assert_eq!(
            caches.get(ResourceKind::Facts).default_ttl(),
            Some(TimeDelta::days(1))
        );
    }

    #[test]
    fn test_save_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let ttls = CacheTtls::default();

        let mut caches = ResourceCaches::load(dir.path(), &ttls);
        caches
            .get_mut(ResourceKind::Submissions)
            .set("submissions_0000320193", json!({"name": "Apple Inc."}), None, None);
        caches.save().unwrap();

        for kind in ResourceKind::ALL {
            assert!(dir.path().join(kind.file_name()).exists());
        }

        let reloaded = ResourceCaches::load(dir.path(), &ttls);
        assert_eq!(
            reloaded
                .get(ResourceKind::Submissions)
                .get("submissions_0000320193"),
            Some(&json!({"name": "Apple Inc."}))
        );
        assert!(reloaded.get(ResourceKind::Facts).is_empty());
    }

    #[test]
    fn test_corrupt_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("company_facts_cache.json"), "{broken").unwrap();
        let caches = ResourceCaches::load(dir.path(), &CacheTtls::default());
        assert!(caches.get(ResourceKind::Facts).is_empty());
        assert_eq!(caches.get(ResourceKind::Facts).name(), "company_facts");
    }
}
