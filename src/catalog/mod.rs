//! Schema Catalog Module
//!
//! Persisted table definitions and declared relations.
//!
//! ## Responsibilities
//! - Create and replace table definitions
//! - Hold the relation manager so relations survive restarts
//! - Record the shard count a data directory was created with
//! - Re-persist the whole catalog, atomically, on every structural change
//!
//! ## File Format
//! Same checksummed frame as shard files (magic `ELDC`) around a bincode
//! body.

mod store;
mod table;

pub use store::Catalog;
pub use table::{Column, ColumnType, Table};
