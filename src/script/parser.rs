//! Line grammar
//!
//! ```text
//! create table NAME schema [col(:type)?, ...] (references [col -> table, ...])?
//! replace table ...
//! add NAME [lit, ...]
//! update NAME [id] [col: lit, ...]
//! delete NAME [id]
//! select NAME [id] | select NAME [*]
//! relate FROM -> TO cascade|restrict
//! flush
//! ```

use crate::catalog::{ColumnType, Table};
use crate::record::{RecordId, Row, Value};
use crate::relation::DeletePolicy;

use super::literal::{Cursor, ParseResult};

/// One parsed script command
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `create table` / `replace table`
    CreateTable { table: Table, overwrite: bool },

    /// Positional insert
    Add { table: String, values: Vec<Value> },

    Update {
        table: String,
        id: RecordId,
        changes: Row,
    },

    Delete { table: String, id: RecordId },

    /// `id == None` selects every record
    Select {
        table: String,
        id: Option<RecordId>,
    },

    Relate {
        from: String,
        to: String,
        policy: DeletePolicy,
    },

    Flush,
}

/// Parse one line; blank lines and `#` comments yield `None`
pub fn parse_line(line: &str) -> ParseResult<Option<Statement>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut cursor = Cursor::new(line);
    let verb = cursor.ident()?.to_ascii_lowercase();
    let statement = match verb.as_str() {
        "create" => create(&mut cursor, false)?,
        "replace" => create(&mut cursor, true)?,
        "add" => Statement::Add {
            table: cursor.ident()?.to_string(),
            values: cursor.list(b'[', b']', |c| c.value())?,
        },
        "update" => update(&mut cursor)?,
        "delete" => Statement::Delete {
            table: cursor.ident()?.to_string(),
            id: bracketed_id(&mut cursor)?,
        },
        "select" => select(&mut cursor)?,
        "relate" => relate(&mut cursor)?,
        "flush" => Statement::Flush,
        other => return Err(format!("unknown command '{}'", other)),
    };

    if !cursor.at_end() {
        return Err(cursor.error("unexpected trailing input"));
    }
    Ok(Some(statement))
}

fn create(cursor: &mut Cursor<'_>, overwrite: bool) -> ParseResult<Statement> {
    cursor.expect_keyword("table")?;
    let mut table = Table::new(cursor.ident()?);

    cursor.expect_keyword("schema")?;
    let columns = cursor.list(b'[', b']', |c| {
        let name = c.ident()?.to_string();
        let kind = if c.eat(b':') {
            let tag = c.ident()?;
            tag.parse::<ColumnType>()
                .map_err(|_| c.error(&format!("unknown column type '{}'", tag)))?
        } else {
            ColumnType::default()
        };
        Ok((name, kind))
    })?;
    for (name, kind) in columns {
        table = table.column(name, kind);
    }

    if cursor.eat_keyword("references") {
        let refs = cursor.list(b'[', b']', |c| {
            let column = c.ident()?.to_string();
            c.expect_arrow()?;
            let target = c.ident()?.to_string();
            Ok((column, target))
        })?;
        for (column, target) in refs {
            table = table.foreign_key(column, target);
        }
    }

    Ok(Statement::CreateTable { table, overwrite })
}

fn update(cursor: &mut Cursor<'_>) -> ParseResult<Statement> {
    let table = cursor.ident()?.to_string();
    let id = bracketed_id(cursor)?;
    let pairs = cursor.list(b'[', b']', |c| {
        let column = c.ident()?.to_string();
        c.expect(b':')?;
        Ok((column, c.value()?))
    })?;

    let mut changes = Row::new();
    for (column, value) in pairs {
        if changes.insert(column.clone(), value).is_some() {
            return Err(format!("column '{}' assigned twice", column));
        }
    }
    Ok(Statement::Update { table, id, changes })
}

fn select(cursor: &mut Cursor<'_>) -> ParseResult<Statement> {
    let table = cursor.ident()?.to_string();
    cursor.expect(b'[')?;
    let id = if cursor.eat(b'*') {
        None
    } else {
        Some(cursor.unsigned()?)
    };
    cursor.expect(b']')?;
    Ok(Statement::Select { table, id })
}

fn relate(cursor: &mut Cursor<'_>) -> ParseResult<Statement> {
    let from = cursor.ident()?.to_string();
    cursor.expect_arrow()?;
    let to = cursor.ident()?.to_string();
    let word = cursor.ident()?;
    let policy = word
        .parse::<DeletePolicy>()
        .map_err(|_| format!("expected 'cascade' or 'restrict', found '{}'", word))?;
    Ok(Statement::Relate { from, to, policy })
}

fn bracketed_id(cursor: &mut Cursor<'_>) -> ParseResult<RecordId> {
    cursor.expect(b'[')?;
    let id = cursor.unsigned()?;
    cursor.expect(b']')?;
    Ok(id)
}
