//! Relation Module
//!
//! Declared foreign-key relationships and their delete policy.
//!
//! A relation `from → to` says: rows of `to` reference rows of `from`
//! through `to`'s foreign-key columns that point at `from`. Deleting a
//! `from` row then either removes the referencing `to` rows (`Cascade`) or
//! is refused (`Restrict`).
//!
//! Each source table has at most one outgoing relation; declaring another
//! replaces it.

mod manager;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ElementalError, Result};

pub use manager::{RelationManager, RowSource};

/// What happens to referencing rows when a referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletePolicy {
    /// Remove referencing rows too
    Cascade,
    /// Refuse the delete while referencing rows exist
    Restrict,
}

impl FromStr for DeletePolicy {
    type Err = ElementalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cascade" => Ok(DeletePolicy::Cascade),
            "restrict" => Ok(DeletePolicy::Restrict),
            other => Err(ElementalError::schema(format!("unknown delete policy: {}", other))),
        }
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletePolicy::Cascade => f.write_str("cascade"),
            DeletePolicy::Restrict => f.write_str("restrict"),
        }
    }
}

/// A directed edge `from → to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub from: String,
    pub to: String,
    pub on_delete: DeletePolicy,
}

impl Relation {
    pub fn new(from: impl Into<String>, to: impl Into<String>, on_delete: DeletePolicy) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            on_delete,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.from, self.to, self.on_delete)
    }
}
