//! On-disk search result cache with a TTL
//!
//! Identical queries within the TTL window (default seven days) are served
//! from disk. Entries live as JSON files keyed by a hash of the query.

use colloquy_application::SearchHit;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct CachedHit {
    url: String,
    title: String,
    snippet: String,
    content: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    query: String,
    fetched_at_secs: u64,
    hits: Vec<CachedHit>,
}

/// File-backed query cache.
pub struct SearchCache {
    dir: PathBuf,
    ttl: Duration,
}

impl SearchCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    /// Cached hits for the query, if present and fresh.
    pub fn get(&self, query: &str) -> Option<Vec<SearchHit>> {
        let path = self.entry_path(query);
        let raw = std::fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = serde_json::from_str(&raw).ok()?;

        if entry.query != query {
            return None;
        }
        let age = now_secs().saturating_sub(entry.fetched_at_secs);
        if age > self.ttl.as_secs() {
            debug!(query, age_secs = age, "Cache entry expired");
            return None;
        }

        debug!(query, hits = entry.hits.len(), "Cache hit");
        Some(
            entry
                .hits
                .into_iter()
                .map(|hit| SearchHit {
                    url: hit.url,
                    title: hit.title,
                    snippet: hit.snippet,
                    content: hit.content,
                })
                .collect(),
        )
    }

    /// Store hits for the query. Failures are silent; the cache is an
    /// optimization, not a dependency.
    pub fn put(&self, query: &str, hits: &[SearchHit]) {
        if std::fs::create_dir_all(&self.dir).is_err() {
            return;
        }
        let entry = CacheEntry {
            query: query.to_string(),
            fetched_at_secs: now_secs(),
            hits: hits
                .iter()
                .map(|hit| CachedHit {
                    url: hit.url.clone(),
                    title: hit.title.clone(),
                    snippet: hit.snippet.clone(),
                    content: hit.content.clone(),
                })
                .collect(),
        };
        if let Ok(json) = serde_json::to_string(&entry) {
            let _ = std::fs::write(self.entry_path(query), json);
        }
    }

    fn entry_path(&self, query: &str) -> PathBuf {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        query.hash(&mut hasher);
        self.dir.join(format!("ddg-{:016x}.json", hasher.finish()))
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Default cache directory under the platform data dir.
pub fn default_cache_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| Path::new(".").to_path_buf())
        .join("colloquy")
        .join("search-cache")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits() -> Vec<SearchHit> {
        vec![SearchHit {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            snippet: "snippet".to_string(),
            content: "content".to_string(),
        }]
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("colloquy-cache-test-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_round_trip() {
        let cache = SearchCache::new(temp_dir("roundtrip"), Duration::from_secs(3600));
        assert!(cache.get("rust consensus").is_none());

        cache.put("rust consensus", &hits());
        let cached = cache.get("rust consensus").unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].url, "https://example.com");
    }

    #[test]
    fn test_expired_entry_misses() {
        let cache = SearchCache::new(temp_dir("expiry"), Duration::ZERO);
        cache.put("query", &hits());
        // TTL of zero: anything stored is already stale.
        assert!(cache.get("query").is_none());
    }

    #[test]
    fn test_distinct_queries_distinct_entries() {
        let cache = SearchCache::new(temp_dir("distinct"), Duration::from_secs(3600));
        cache.put("alpha", &hits());
        assert!(cache.get("beta").is_none());
    }
}
