//! Shard Router
//!
//! Maps a table name to its shard by CRC32 of the name, which is stable
//! across processes (`DefaultHasher` is seeded per process).

use super::ShardId;

/// Deterministic table → shard routing
#[derive(Debug, Clone, Copy)]
pub struct ShardRouter {
    shard_count: usize,
}

impl ShardRouter {
    /// Create a router over `shard_count` shards (at least 1)
    pub fn new(shard_count: usize) -> Self {
        Self {
            shard_count: shard_count.max(1),
        }
    }

    /// Shard holding `table`
    pub fn shard_for(&self, table: &str) -> ShardId {
        let hash = crc32fast::hash(table.as_bytes());
        ShardId(hash as usize % self.shard_count)
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// Every shard id, ascending
    pub fn shard_ids(&self) -> impl Iterator<Item = ShardId> {
        (0..self.shard_count).map(ShardId)
    }
}
