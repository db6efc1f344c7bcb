//! Record Module
//!
//! Rows as stored in shards, cached, and returned to callers.
//!
//! A record is the system `id` column plus a map of declared column name to
//! value. The id is assigned once at insert and never changes; field values
//! are replaced by updates.

mod value;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use value::Value;

/// System-assigned primary key
pub type RecordId = u64;

/// Column name → value, as supplied by callers
pub type Row = BTreeMap<String, Value>;

/// A stored row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Primary key, unique per table
    pub id: RecordId,

    /// Declared column values
    pub fields: Row,
}

impl Record {
    pub fn new(id: RecordId, fields: Row) -> Self {
        Self { id, fields }
    }

    /// Value of a column (`"id"` resolves to the system column)
    pub fn get(&self, column: &str) -> Option<Value> {
        if column == "id" {
            return Some(Value::from(self.id));
        }
        self.fields.get(column).cloned()
    }

    /// Whether any of `columns` holds a reference to `id`
    pub fn references(&self, columns: &[String], id: RecordId) -> bool {
        columns
            .iter()
            .any(|c| self.fields.get(c).and_then(Value::as_id) == Some(id))
    }
}

/// Build a [`Row`] from `(column, value)` pairs
///
/// ```
/// use elementaldb::record::{row, Value};
///
/// let r = row([("username", Value::from("a")), ("email", Value::from("a@x"))]);
/// assert_eq!(r.len(), 2);
/// ```
pub fn row<K, I>(pairs: I) -> Row
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
