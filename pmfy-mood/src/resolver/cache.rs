//! Bounded LRU cache for batch lookups
//!
//! Holds definitive outcomes only: found values and not-found answers.
//! Transient failures are never cached.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Definitive lookup outcome
#[derive(Debug, Clone, PartialEq)]
pub enum CachedOutcome<V> {
    Found(V),
    NotFound,
}

/// Thread-safe LRU cache shared by the workers of one resolver
pub struct ResolverCache<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, CachedOutcome<V>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<K: Hash + Eq, V: Clone> ResolverCache<K, V> {
    /// Create cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<K, CachedOutcome<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a key, refreshing its recency on hit
    pub fn get(&self, key: &K) -> Option<CachedOutcome<V>> {
        let found = self.lock().get(key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Store an outcome, evicting the least recently used entry when full
    pub fn insert(&self, key: K, outcome: CachedOutcome<V>) {
        self.lock().put(key, outcome);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss_counters() {
        let cache: ResolverCache<&str, u32> = ResolverCache::new(4);
        assert!(cache.get(&"a").is_none());
        cache.insert("a", CachedOutcome::Found(1));
        assert_eq!(cache.get(&"a"), Some(CachedOutcome::Found(1)));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_lru_eviction() {
        let cache: ResolverCache<u32, u32> = ResolverCache::new(2);
        cache.insert(1, CachedOutcome::Found(10));
        cache.insert(2, CachedOutcome::Found(20));

        // Touch 1 so 2 becomes least recently used
        let _ = cache.get(&1);
        cache.insert(3, CachedOutcome::NotFound);

        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
        assert_eq!(cache.get(&3), Some(CachedOutcome::NotFound));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let cache: ResolverCache<u32, u32> = ResolverCache::new(0);
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn test_clear_resets() {
        let cache: ResolverCache<u32, u32> = ResolverCache::new(2);
        cache.insert(1, CachedOutcome::Found(1));
        let _ = cache.get(&1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.hits(), 0);
    }
}
