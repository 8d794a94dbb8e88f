//! Time-bounded LRU cache for query results, keyed on the canonical JSON of
//! the request. Entries older than the TTL are treated as misses even if
//! still resident, so a stale answer is never returned past its window.

use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_CAPACITY: usize = 1_000;
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct Entry {
    value: Value,
    inserted_at: Instant,
}

pub struct ResultCache {
    inner: Mutex<LruCache<String, Entry>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(
                std::num::NonZeroUsize::new(capacity.max(1)).unwrap(),
            )),
            ttl,
        }
    }

    /// Build the cache key from any request struct that serializes
    /// deterministically (field order is stable for a given type).
    pub fn key(request: &impl Serialize) -> String {
        serde_json::to_string(request).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.lock();
        let entry = inner.get(key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            inner.pop(key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn put(&self, key: String, value: Value) {
        self.inner.lock().put(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hits_within_ttl_misses_after() {
        let cache = ResultCache::new(10, Duration::from_millis(20));
        cache.put("k".to_string(), json!({"a": 1}));
        assert!(cache.get("k").is_some());

        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn key_is_stable_for_same_request() {
        #[derive(Serialize)]
        struct Req {
            file_path: String,
            depth: usize,
        }
        let a = Req { file_path: "a.rs".into(), depth: 2 };
        let b = Req { file_path: "a.rs".into(), depth: 2 };
        assert_eq!(ResultCache::key(&a), ResultCache::key(&b));
    }
}
