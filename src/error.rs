//! Error types for ElementalDB
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::storage::ShardId;

/// Result type alias using ElementalError
pub type Result<T> = std::result::Result<T, ElementalError>;

/// Unified error type for ElementalDB operations
#[derive(Debug, Error)]
pub enum ElementalError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Structural Errors (returned to the caller untouched)
    // -------------------------------------------------------------------------
    /// A table, record or relation does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A table with the same name is already declared
    #[error("Table already exists: {0}")]
    AlreadyExists(String),

    /// Row shape does not match the table's columns
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Missing referenced row, or a delete blocked by a restrict relation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    /// Shard file failed to decode. Handled by the shard loader, which
    /// resets the shard; callers only see it from the codec directly.
    #[error("Corrupt shard {shard}: {reason}")]
    CorruptShard { shard: ShardId, reason: String },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Script Errors
    // -------------------------------------------------------------------------
    #[error("Script error on line {line}: {message}")]
    Script { line: usize, message: String },
}

impl ElementalError {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        ElementalError::NotFound(what.into())
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        ElementalError::SchemaMismatch(msg.into())
    }
}
