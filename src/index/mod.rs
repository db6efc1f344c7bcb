//! Primary-Key Index Module
//!
//! One B-tree per table over record ids, used for existence checks.
//!
//! ## Responsibilities
//! - O(log n) `search` of a record id
//! - `insert` with pre-emptive splitting (never descends into a full node)
//! - Rebuilt from shard contents on first access, never persisted
//!
//! ## Deletions
//! There is no delete primitive. Deleting a record removes it from the shard
//! and the cache only, so the tree may keep a dangling id. A positive
//! `search` is therefore a hint: callers re-verify against the shard before
//! trusting it.

mod btree;

pub use btree::BTreeIndex;
