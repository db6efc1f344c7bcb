//! Storage Module
//!
//! Persistent storage layer: a fixed set of shard files, each holding the
//! records of every table hashed into it.
//!
//! ## Responsibilities
//! - Route table names to shards (stable CRC32 hash)
//! - Encode/decode shard content inside a checksummed frame
//! - Merge buffered records into id-sorted sequences on flush
//! - Persist whole shards atomically (write temp file, fsync, rename)
//! - Reset corrupt shards to empty and log the recovery
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic (4) | Version: u16 (2) | BodyLen: u32 (4)       │
//! │   BodyCRC: u32 (4)                                      │
//! ├─────────────────────────────────────────────────────────┤
//! │ Body (bincode)                                          │
//! │   table name → { next_id, records sorted by id }        │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod codec;
mod file;
mod manager;
mod router;
mod shard;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use codec::{decode_shard, encode_shard, ShardData, TableData};
pub use manager::StorageManager;
pub use router::ShardRouter;
pub use shard::Shard;

pub(crate) use codec::{decode_frame, encode_frame, CATALOG_MAGIC};
pub(crate) use file::write_atomic;

/// Index of a shard file, `0..shard_count`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardId(pub usize);

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shard_{:03}", self.0)
    }
}
