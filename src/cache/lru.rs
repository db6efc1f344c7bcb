//! LRU cache
//!
//! Recency is tracked with a monotonically increasing tick: every touch
//! moves the key to a fresh tick, and the smallest tick is the eviction
//! victim. Lookup is O(1), touch and eviction O(log n).

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use super::CacheStats;

/// Fixed-capacity least-recently-used cache
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    /// key → (value, last-use tick)
    entries: HashMap<K, (V, u64)>,
    /// last-use tick → key, oldest first
    order: BTreeMap<u64, K>,
    tick: u64,
    stats: CacheStats,
}

impl<K: Hash + Eq + Clone, V: Clone> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: BTreeMap::new(),
            tick: 0,
            stats: CacheStats::default(),
        }
    }

    /// Look up `key`, marking it most recently used on a hit
    pub fn get(&mut self, key: &K) -> Option<V> {
        let next = self.next_tick();
        match self.entries.get_mut(key) {
            Some((value, tick)) => {
                self.order.remove(tick);
                *tick = next;
                self.order.insert(next, key.clone());
                self.stats.hits += 1;
                Some(value.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Insert or replace `key`, evicting the least recently used entry if full
    pub fn insert(&mut self, key: K, value: V) {
        let next = self.next_tick();

        if let Some((_, old_tick)) = self.entries.remove(&key) {
            self.order.remove(&old_tick);
        } else if self.entries.len() >= self.capacity {
            self.evict_lru();
        }

        self.order.insert(next, key.clone());
        self.entries.insert(key, (value, next));
    }

    /// Drop `key`; returns whether it was cached
    pub fn remove(&mut self, key: &K) -> bool {
        match self.entries.remove(key) {
            Some((_, tick)) => {
                self.order.remove(&tick);
                true
            }
            None => false,
        }
    }

    /// Drop every entry whose key fails `keep`
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K) -> bool,
    {
        let doomed: Vec<(K, u64)> = self
            .entries
            .iter()
            .filter(|(k, _)| !keep(k))
            .map(|(k, (_, tick))| (k.clone(), *tick))
            .collect();
        for (key, tick) in doomed {
            self.entries.remove(&key);
            self.order.remove(&tick);
        }
    }

    /// Check presence without touching recency
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn evict_lru(&mut self) {
        if let Some((_, key)) = self.order.pop_first() {
            self.entries.remove(&key);
            self.stats.evictions += 1;
        }
    }
}
