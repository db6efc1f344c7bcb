//! Cache Module
//!
//! Bounded LRU cache of records keyed by (table, id).
//!
//! ## Rules
//! - populated on read and insert
//! - invalidated on update and delete
//! - no negative caching: a miss is never remembered

mod lru;

pub use lru::LruCache;

use crate::record::{Record, RecordId};

/// Cache key: (table name, record id)
pub type RecordKey = (String, RecordId);

/// The engine's record cache
pub type RecordCache = LruCache<RecordKey, Record>;

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0.0 when nothing was looked up
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
