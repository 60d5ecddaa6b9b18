//! Capacity-bounded LRU cache with per-entry TTL
//!
//! Recency is tracked with a queue of (key, stamp) records. Touching an entry
//! pushes a new record and leaves the old one behind; eviction pops records
//! until it finds one whose stamp still matches the live entry. The queue is
//! rebuilt when stale records pile up, which keeps both operations O(1)
//! amortized.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde_json::Value;

use super::key::CacheKey;

/// Stale recency records tolerated per live entry before a rebuild
const RECENCY_SLACK: usize = 4;

/// Default maximum number of cached responses
pub const DEFAULT_CAPACITY: usize = 512;

/// A cached upstream payload
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub fetched_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    /// An entry counts as a hit while `fetched_at + ttl >= now`
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        self.fetched_at + self.ttl >= now
    }
}

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    stamp: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<CacheKey, Slot>,
    recency: VecDeque<(CacheKey, u64)>,
    next_stamp: u64,
}

impl Inner {
    fn stamp(&mut self) -> u64 {
        self.next_stamp += 1;
        self.next_stamp
    }

    fn touch(&mut self, key: &CacheKey) -> Option<u64> {
        let stamp = self.stamp();
        let slot = self.entries.get_mut(key)?;
        slot.stamp = stamp;
        self.recency.push_back((key.clone(), stamp));
        Some(stamp)
    }

    /// Remove the least recently used live entry
    fn evict_lru(&mut self) -> Option<CacheKey> {
        while let Some((key, stamp)) = self.recency.pop_front() {
            let live = self.entries.get(&key).is_some_and(|slot| slot.stamp == stamp);
            if live {
                self.entries.remove(&key);
                return Some(key);
            }
        }
        None
    }

    /// Drop stale recency records once they outnumber live entries
    fn compact(&mut self) {
        let limit = (self.entries.len() + 1) * RECENCY_SLACK;
        if self.recency.len() <= limit {
            return;
        }
        let mut live: Vec<(CacheKey, u64)> = self
            .entries
            .iter()
            .map(|(key, slot)| (key.clone(), slot.stamp))
            .collect();
        live.sort_by_key(|(_, stamp)| *stamp);
        self.recency = live.into_iter().collect();
    }
}

/// Thread-safe response cache shared by all concurrent dispatches
#[derive(Debug)]
pub struct ResponseCache {
    capacity: usize,
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ResponseCache {
    /// Create a cache holding at most `capacity` entries (0 disables caching)
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a fresh payload
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        self.get_at(key, Instant::now())
    }

    /// Look up a payload as of `now`; expired entries are dropped
    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Value> {
        let mut inner = self.lock();

        let fresh = match inner.entries.get(key) {
            Some(slot) => slot.entry.is_fresh_at(now),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if !fresh {
            inner.entries.remove(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("cache expired: {}", key);
            return None;
        }

        inner.touch(key);
        inner.compact();
        self.hits.fetch_add(1, Ordering::Relaxed);
        inner.entries.get(key).map(|slot| slot.entry.value.clone())
    }

    /// Store a payload for `ttl`; a zero TTL stores nothing
    pub fn put(&self, key: CacheKey, value: Value, ttl: Duration) {
        self.put_at(key, value, ttl, Instant::now())
    }

    /// Store a payload fetched at `now`
    pub fn put_at(&self, key: CacheKey, value: Value, ttl: Duration, now: Instant) {
        if self.capacity == 0 || ttl.is_zero() {
            return;
        }

        let mut inner = self.lock();
        let stamp = inner.stamp();
        let entry = CacheEntry {
            value,
            fetched_at: now,
            ttl,
        };

        if let Some(slot) = inner.entries.get_mut(&key) {
            slot.entry = entry;
            slot.stamp = stamp;
        } else {
            while inner.entries.len() >= self.capacity {
                match inner.evict_lru() {
                    Some(evicted) => {
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                        debug!("cache evicted: {}", evicted);
                    }
                    None => break,
                }
            }
            inner.entries.insert(key.clone(), Slot { entry, stamp });
        }

        inner.recency.push_back((key, stamp));
        inner.compact();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Acquire the lock; a poisoned cache is emptied and reused
    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("response cache lock poisoned, discarding cached entries");
                let mut guard = poisoned.into_inner();
                guard.entries.clear();
                guard.recency.clear();
                self.inner.clear_poison();
                guard
            }
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn key(name: &str) -> CacheKey {
        CacheKey::new("test-tool", name)
    }

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_get_missing() {
        let cache = ResponseCache::new(4);
        assert!(cache.get(&key("a")).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_put_then_get() {
        let cache = ResponseCache::new(4);
        cache.put(key("a"), json!({"n": 1}), MINUTE);

        assert_eq!(cache.get(&key("a")), Some(json!({"n": 1})));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_entry_fresh_until_ttl_boundary() {
        let cache = ResponseCache::new(4);
        let t0 = Instant::now();
        cache.put_at(key("a"), json!(1), MINUTE, t0);

        assert!(cache.get_at(&key("a"), t0 + MINUTE).is_some());
        assert!(cache.get_at(&key("a"), t0 + MINUTE + Duration::from_millis(1)).is_none());
        // Expired entries are removed on read
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_ttl_not_stored() {
        let cache = ResponseCache::new(4);
        cache.put(key("a"), json!(1), Duration::ZERO);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let cache = ResponseCache::new(0);
        cache.put(key("a"), json!(1), MINUTE);
        assert!(cache.get(&key("a")).is_none());
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let cache = ResponseCache::new(4);
        cache.put(key("a"), json!(1), MINUTE);
        cache.put(key("a"), json!(2), MINUTE);

        assert_eq!(cache.get(&key("a")), Some(json!(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_least_recently_inserted() {
        let cache = ResponseCache::new(2);
        cache.put(key("a"), json!("a"), MINUTE);
        cache.put(key("b"), json!("b"), MINUTE);
        cache.put(key("c"), json!("c"), MINUTE);

        assert!(cache.get(&key("a")).is_none());
        assert!(cache.get(&key("b")).is_some());
        assert!(cache.get(&key("c")).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = ResponseCache::new(2);
        cache.put(key("a"), json!("a"), MINUTE);
        cache.put(key("b"), json!("b"), MINUTE);

        // Touch "a" so "b" becomes the LRU entry
        assert!(cache.get(&key("a")).is_some());
        cache.put(key("c"), json!("c"), MINUTE);

        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("b")).is_none());
        assert!(cache.get(&key("c")).is_some());
    }

    #[test]
    fn test_overwrite_refreshes_recency() {
        let cache = ResponseCache::new(2);
        cache.put(key("a"), json!(1), MINUTE);
        cache.put(key("b"), json!(1), MINUTE);
        cache.put(key("a"), json!(2), MINUTE);
        cache.put(key("c"), json!(1), MINUTE);

        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("b")).is_none());
    }

    #[test]
    fn test_recency_queue_stays_bounded() {
        let cache = ResponseCache::new(2);
        cache.put(key("a"), json!(1), MINUTE);
        cache.put(key("b"), json!(1), MINUTE);
        for _ in 0..1_000 {
            cache.get(&key("a"));
            cache.get(&key("b"));
        }

        let inner = cache.lock();
        assert!(inner.recency.len() <= (inner.entries.len() + 1) * RECENCY_SLACK + 1);
    }

    #[test]
    fn test_eviction_order_survives_compaction() {
        let cache = ResponseCache::new(3);
        cache.put(key("a"), json!(1), MINUTE);
        cache.put(key("b"), json!(1), MINUTE);
        cache.put(key("c"), json!(1), MINUTE);
        for _ in 0..50 {
            cache.get(&key("c"));
            cache.get(&key("a"));
        }
        cache.put(key("d"), json!(1), MINUTE);

        assert!(cache.get(&key("b")).is_none());
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(ResponseCache::new(64));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let k = key(&format!("{}", (t * 7 + i) % 100));
                        cache.put(k.clone(), json!(i), MINUTE);
                        cache.get(&k);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 64);
    }

    #[test]
    fn test_poisoned_lock_recovers_empty() {
        let cache = Arc::new(ResponseCache::new(4));
        cache.put(key("a"), json!(1), MINUTE);

        let poisoner = Arc::clone(&cache);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("poison the cache lock");
        })
        .join();

        assert!(cache.get(&key("a")).is_none());
        cache.put(key("b"), json!(2), MINUTE);
        assert_eq!(cache.get(&key("b")), Some(json!(2)));
    }
}
