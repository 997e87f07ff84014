use chrono::{DateTime, Utc};
use dashmap::DashMap;

struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// Per-symbol response cache with a fixed TTL, one instance per fetched
/// resource kind. Mirrors the orchestrator's own request-coalescing
/// behavior: repeat requests for the same symbol within the freshness
/// window are served without hitting the network again.
pub struct TtlCache<T> {
    entries: DashMap<String, CacheEntry<T>>,
    ttl_secs: i64,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_secs,
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        let age = (Utc::now() - entry.cached_at).num_seconds();
        if age < self.ttl_secs {
            Some(entry.data.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, key: &str, data: T) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                cached_at: Utc::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_returned() {
        let cache: TtlCache<i32> = TtlCache::new(300);
        cache.insert("a", 42);
        assert_eq!(cache.get("a"), Some(42));
    }

    #[test]
    fn expired_entry_is_absent() {
        let cache: TtlCache<i32> = TtlCache::new(-1);
        cache.insert("a", 42);
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn missing_key_is_absent() {
        let cache: TtlCache<i32> = TtlCache::new(300);
        assert_eq!(cache.get("missing"), None);
    }
}
