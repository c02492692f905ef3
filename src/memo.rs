//! Bounded LRU+TTL memoization cache.
//!
//! Used by the unit engine to short-circuit repeated conversions. Entries
//! are evicted by capacity (least recently used) and by age; neither affects
//! correctness, only repeated-input performance.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;

struct MemoEntry<V> {
    value: V,
    inserted_at: Instant,
}

pub struct MemoCache<K: Hash + Eq, V: Clone> {
    entries: LruCache<K, MemoEntry<V>>,
    ttl: Duration,
}

impl<K: Hash + Eq, V: Clone> MemoCache<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl,
        }
    }

    /// Returns the cached value if present and younger than the TTL.
    /// Expired entries are dropped on access.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
            None => return None,
        };
        if expired {
            self.entries.pop(key);
            return None;
        }
        self.entries.get(key).map(|e| e.value.clone())
    }

    pub fn put(&mut self, key: K, value: V) {
        self.entries.put(
            key,
            MemoEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
