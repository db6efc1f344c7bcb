//! # ElementalDB
//!
//! An embedded, file-backed table store with:
//! - Tables with declared columns and foreign keys
//! - Records sharded across a fixed set of checksummed files
//! - A per-table B-tree primary-key index and a bounded LRU cache
//! - Batched writes with atomic shard rewrites
//! - Cascade/restrict delete policies between tables
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Script Front End (optional)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine Façade                          │
//! │            (Single Writer / Multi Reader)                    │
//! └──────┬──────────────┬──────────────────┬────────────────────┘
//!        │              │                  │
//!        ▼              ▼                  ▼
//! ┌─────────────┐ ┌─────────────┐   ┌─────────────┐
//! │   Catalog   │ │  LRU Cache  │   │   Storage   │
//! │ + Relations │ │  (Mutex)    │   │  (Router)   │
//! └─────────────┘ └─────────────┘   └──────┬──────┘
//!                                          │ one Mutex per shard
//!                                          ▼
//!                        ┌──────────────────────────────────┐
//!                        │ Shard: buffer + B-tree + records │
//!                        │      (shards/shard_NNN.db)       │
//!                        └──────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use elementaldb::{ColumnType, Engine, Table, Value};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let engine = Engine::open_path(dir.path()).unwrap();
//!
//! engine
//!     .create_table(Table::new("users").column("name", ColumnType::Text))
//!     .unwrap();
//! let id = engine.add_values("users", vec![Value::from("ann")]).unwrap();
//! assert_eq!(engine.get("users", id).unwrap().get("name"), Some(Value::from("ann")));
//! engine.close().unwrap();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod index;
pub mod cache;
pub mod buffer;
pub mod storage;
pub mod catalog;
pub mod relation;
pub mod engine;
pub mod script;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ElementalError, Result};
pub use config::Config;
pub use engine::{DeleteOutcome, Engine};
pub use catalog::{ColumnType, Table};
pub use record::{Record, RecordId, Row, Value};
pub use relation::{DeletePolicy, Relation};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ElementalDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
