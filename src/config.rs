//! Configuration for ElementalDB
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{ElementalError, Result};

/// Main configuration for an ElementalDB instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── catalog.db       (table schemas + relations)
    ///     └── shards/          (shard_000.db .. shard_NNN.db)
    pub data_dir: PathBuf,

    /// Number of shard files tables are hashed into.
    /// Fixed for the lifetime of a data directory.
    pub shard_count: usize,

    /// fsync shard and catalog files before the atomic rename
    pub sync_writes: bool,

    // -------------------------------------------------------------------------
    // Write Buffer Configuration
    // -------------------------------------------------------------------------
    /// Buffered records per shard before an automatic flush
    pub batch_size: usize,

    // -------------------------------------------------------------------------
    // Cache / Index Configuration
    // -------------------------------------------------------------------------
    /// Max records held by the LRU cache
    pub cache_capacity: usize,

    /// Minimum degree `t` of the primary-key B-tree
    pub index_degree: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./elementaldb_data"),
            shard_count: 3,
            sync_writes: true,
            batch_size: 500,
            cache_capacity: 100,
            index_degree: 2,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject values the engine cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(ElementalError::Config(
                "shard_count must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ElementalError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(ElementalError::Config(
                "cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.index_degree < 2 {
            return Err(ElementalError::Config(format!(
                "index_degree must be at least 2, got {}",
                self.index_degree
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the number of shard files
    pub fn shard_count(mut self, count: usize) -> Self {
        self.config.shard_count = count;
        self
    }

    /// Enable or disable fsync on persist
    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.config.sync_writes = sync;
        self
    }

    /// Set the write buffer flush threshold (records per shard)
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the LRU cache capacity (records)
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Set the B-tree minimum degree
    pub fn index_degree(mut self, degree: usize) -> Self {
        self.config.index_degree = degree;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
