//! Table definitions

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ElementalError, Result};

/// Declared type tag of a column
///
/// Tags document intent only; values are not checked against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnType {
    #[default]
    Text,
    Integer,
    Real,
    Boolean,
    Any,
}

impl FromStr for ColumnType {
    type Err = ElementalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "string" => Ok(ColumnType::Text),
            "integer" | "int" => Ok(ColumnType::Integer),
            "real" | "float" => Ok(ColumnType::Real),
            "boolean" | "bool" => Ok(ColumnType::Boolean),
            "any" => Ok(ColumnType::Any),
            other => Err(ElementalError::schema(format!("unknown column type: {}", other))),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Any => "ANY",
        };
        f.write_str(name)
    }
}

/// A declared column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

/// A table definition
///
/// ```
/// use elementaldb::catalog::{ColumnType, Table};
///
/// let posts = Table::new("posts")
///     .column("title", ColumnType::Text)
///     .column("user_id", ColumnType::Integer)
///     .foreign_key("user_id", "users");
/// assert_eq!(posts.column_names(), vec!["title", "user_id"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,

    /// Ordered; immutable once the table is created
    pub columns: Vec<Column>,

    /// column → referenced table
    pub foreign_keys: BTreeMap<String, String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: BTreeMap::new(),
        }
    }

    /// Append a column
    pub fn column(mut self, name: impl Into<String>, kind: ColumnType) -> Self {
        self.columns.push(Column {
            name: name.into(),
            kind,
        });
        self
    }

    /// Declare `column` as referencing ids of `table`
    pub fn foreign_key(mut self, column: impl Into<String>, table: impl Into<String>) -> Self {
        self.foreign_keys.insert(column.into(), table.into());
        self
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Foreign-key columns of this table that reference `parent`
    pub fn columns_referencing(&self, parent: &str) -> Vec<String> {
        self.foreign_keys
            .iter()
            .filter(|(_, target)| target.as_str() == parent)
            .map(|(column, _)| column.clone())
            .collect()
    }

    /// Check the definition is self-consistent
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ElementalError::schema("table name must not be empty"));
        }
        if self.columns.is_empty() {
            return Err(ElementalError::schema(format!(
                "table {} must declare at least one column",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Err(ElementalError::schema(format!(
                    "table {} has an empty column name",
                    self.name
                )));
            }
            if column.name == "id" {
                return Err(ElementalError::schema(format!(
                    "table {}: id is a system column",
                    self.name
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(ElementalError::schema(format!(
                    "table {}: duplicate column {}",
                    self.name, column.name
                )));
            }
        }

        if let Some(column) = self.foreign_keys.keys().find(|c| !self.has_column(c)) {
            return Err(ElementalError::schema(format!(
                "table {}: foreign key on undeclared column {}",
                self.name, column
            )));
        }

        Ok(())
    }
}
