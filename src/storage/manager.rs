//! Storage Manager
//!
//! Owns the fixed set of shards and routes tables to them.
//!
//! ## Responsibilities
//! - Lay out shard files under the storage directory
//! - Route table names to shards
//! - Flush one or all shards
//!
//! ## Concurrency:
//! - Each shard sits behind its own `Mutex`: a shard's buffer, index and
//!   persisted content are always mutated together, never interleaved
//! - Callers hold at most one shard lock at a time

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, MutexGuard};

use crate::config::Config;
use crate::error::{ElementalError, Result};

use super::{Shard, ShardId, ShardRouter};

/// Manages the storage layer
pub struct StorageManager {
    /// Directory where shard files are stored
    shard_dir: PathBuf,

    router: ShardRouter,

    /// One entry per shard id
    shards: Vec<Mutex<Shard>>,
}

impl StorageManager {
    /// Open or create storage in the given directory
    ///
    /// Shards are loaded lazily on first access.
    pub fn open(path: &Path, config: &Config) -> Result<Self> {
        fs::create_dir_all(path)?;

        let router = ShardRouter::new(config.shard_count);
        let shards = router
            .shard_ids()
            .map(|id| {
                Mutex::new(Shard::new(
                    id,
                    Self::shard_path_with_dir(path, id),
                    config.batch_size,
                    config.index_degree,
                    config.sync_writes,
                ))
            })
            .collect();

        Ok(Self {
            shard_dir: path.to_path_buf(),
            router,
            shards,
        })
    }

    /// Shard holding `table`
    pub fn shard_for(&self, table: &str) -> ShardId {
        self.router.shard_for(table)
    }

    /// Lock a shard by id
    ///
    /// Ids come from this manager's router, so they are always in range.
    pub fn lock(&self, id: ShardId) -> MutexGuard<'_, Shard> {
        self.shards[id.0].lock()
    }

    /// Lock the shard holding `table`
    pub fn lock_table(&self, table: &str) -> MutexGuard<'_, Shard> {
        self.lock(self.shard_for(table))
    }

    /// Create the shard's container file if it does not exist yet
    pub fn ensure_shard(&self, id: ShardId) -> Result<()> {
        self.check_id(id)?;
        self.lock(id).load()
    }

    /// Flush one shard; returns the number of records written
    pub fn flush_shard(&self, id: ShardId) -> Result<usize> {
        self.check_id(id)?;
        self.lock(id).flush()
    }

    /// Flush every shard, one at a time
    pub fn flush_all(&self) -> Result<usize> {
        let mut total = 0;
        for id in self.router.shard_ids() {
            total += self.lock(id).flush()?;
        }
        Ok(total)
    }

    /// Records buffered across all shards
    pub fn buffered_len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().buffered_len()).sum()
    }

    /// Corrupt-shard resets since open
    pub fn recoveries(&self) -> u64 {
        self.shards.iter().map(|s| s.lock().recoveries()).sum()
    }

    pub fn shard_count(&self) -> usize {
        self.router.shard_count()
    }

    pub fn router(&self) -> &ShardRouter {
        &self.router
    }

    /// Get the shard directory path
    pub fn shard_dir(&self) -> &Path {
        &self.shard_dir
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_id(&self, id: ShardId) -> Result<()> {
        if id.0 >= self.shards.len() {
            return Err(ElementalError::not_found(format!(
                "{} (shard count is {})",
                id,
                self.shards.len()
            )));
        }
        Ok(())
    }

    /// "shard_007.db" for id 7
    fn shard_path_with_dir(dir: &Path, id: ShardId) -> PathBuf {
        dir.join(format!("{}.db", id))
    }
}
