//! Write Buffer Module
//!
//! Per-shard staging area for records accepted by `add` but not yet merged
//! into the shard file.
//!
//! ## Responsibilities
//! - Keep accepted records in insertion order
//! - Serve reads, updates and deletes of not-yet-flushed records
//! - Report when the batch threshold is reached
//!
//! ## Durability Boundary
//! A buffered record only survives a restart once its shard is flushed.
//! The engine flushes on threshold, on request, and on close.

mod write_buffer;

pub use write_buffer::{BufferedRecord, WriteBuffer};
