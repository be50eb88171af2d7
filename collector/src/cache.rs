use lru::LruCache;
use std::{
    num::NonZeroUsize,
    time::Duration,
};
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted: Instant,
}

/// String-keyed cache whose entries expire a fixed time after insertion.
///
/// Lookups only peek, so the recency order is the insertion order and the least recent entry is always the next
/// to expire. When full, expired entries are dropped first and then the oldest insertion.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: LruCache<String, CacheEntry<V>>,
    ttl: Duration,
}

impl<V> TtlCache<V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN)),
            ttl,
        }
    }

    /// Returns the value if present and not yet expired.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries
            .peek(key)
            .filter(|entry| entry.inserted.elapsed() < self.ttl)
            .map(|entry| &entry.value)
    }

    /// Inserts or refreshes `key`. A full cache evicts its oldest insertion.
    pub fn insert(&mut self, key: String, value: V) {
        self.remove_expired();
        self.entries.put(
            key,
            CacheEntry {
                value,
                inserted: Instant::now(),
            },
        );
    }

    pub fn remove_expired(&mut self) {
        while self
            .entries
            .peek_lru()
            .is_some_and(|(_, entry)| entry.inserted.elapsed() >= self.ttl)
        {
            self.entries.pop_lru();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
