//! Script runner
//!
//! Executes parsed statements against an [`Engine`], one façade call each.

use std::fmt;

use crate::catalog::Table;
use crate::engine::{DeleteOutcome, Engine};
use crate::error::{ElementalError, Result};
use crate::record::{Record, RecordId};
use crate::relation::Relation;

use super::parser::{parse_line, Statement};

/// Result of one executed statement
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    TableCreated(Table),
    Added { table: String, id: RecordId },
    Updated { table: String, record: Record },
    Deleted(DeleteOutcome),
    Selected { table: String, records: Vec<Record> },
    Related(Relation),
    Flushed(usize),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::TableCreated(table) => {
                write!(f, "table {} (", table.name)?;
                for (i, column) in table.columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}:{}", column.name, column.kind)?;
                }
                f.write_str(")")
            }
            Outcome::Added { table, id } => write!(f, "added {}#{}", table, id),
            Outcome::Updated { table, record } => {
                write!(f, "updated ")?;
                write_record(f, table, record)
            }
            Outcome::Deleted(outcome) => write!(
                f,
                "deleted {} row(s), {} by cascade",
                outcome.removed.len(),
                outcome.cascaded().len()
            ),
            Outcome::Selected { table, records } => {
                if records.is_empty() {
                    return write!(f, "{}: no records", table);
                }
                for (i, record) in records.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write_record(f, table, record)?;
                }
                Ok(())
            }
            Outcome::Related(relation) => write!(f, "relation {}", relation),
            Outcome::Flushed(count) => write!(f, "flushed {} record(s)", count),
        }
    }
}

fn write_record(f: &mut fmt::Formatter<'_>, table: &str, record: &Record) -> fmt::Result {
    write!(f, "{}#{} {{", table, record.id)?;
    for (i, (column, value)) in record.fields.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}: {}", column, value)?;
    }
    f.write_str("}")
}

/// Counts for a whole script run
#[derive(Debug, Default)]
pub struct ScriptSummary {
    /// Statements that succeeded
    pub executed: usize,

    /// (line number, error) of statements that failed under `keep_going`
    pub failures: Vec<(usize, ElementalError)>,
}

/// Drives an engine from script text
pub struct ScriptRunner<'a> {
    engine: &'a Engine,
}

impl<'a> ScriptRunner<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Execute one statement
    pub fn execute(&self, statement: Statement) -> Result<Outcome> {
        let engine = self.engine;
        let outcome = match statement {
            Statement::CreateTable { table, overwrite } => {
                let table = if overwrite {
                    engine.replace_table(table)?
                } else {
                    engine.create_table(table)?
                };
                Outcome::TableCreated(table)
            }
            Statement::Add { table, values } => {
                let id = engine.add_values(&table, values)?;
                Outcome::Added { table, id }
            }
            Statement::Update { table, id, changes } => {
                let record = engine.update(&table, id, changes)?;
                Outcome::Updated { table, record }
            }
            Statement::Delete { table, id } => Outcome::Deleted(engine.delete(&table, id)?),
            Statement::Select { table, id } => {
                let records = match id {
                    Some(id) => vec![engine.get(&table, id)?],
                    None => engine.get_all(&table)?,
                };
                Outcome::Selected { table, records }
            }
            Statement::Relate { from, to, policy } => {
                Outcome::Related(engine.declare_relation(&from, &to, policy)?)
            }
            Statement::Flush => Outcome::Flushed(engine.flush()?),
        };
        Ok(outcome)
    }

    /// Parse and execute line `line_no` (1-based)
    ///
    /// Returns `None` for blank and comment lines. Grammar errors become
    /// `Script` errors; engine errors pass through unchanged.
    pub fn run_line(&self, line_no: usize, line: &str) -> Result<Option<Outcome>> {
        let statement = parse_line(line).map_err(|message| ElementalError::Script {
            line: line_no,
            message,
        })?;
        match statement {
            Some(statement) => self.execute(statement).map(Some),
            None => Ok(None),
        }
    }

    /// Run every line of `text`, reporting each outcome to `on_outcome`
    ///
    /// Stops at the first failing line unless `keep_going` is set, in which
    /// case failures are collected in the summary.
    pub fn run_script<F>(&self, text: &str, keep_going: bool, mut on_outcome: F) -> Result<ScriptSummary>
    where
        F: FnMut(usize, &Outcome),
    {
        let mut summary = ScriptSummary::default();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            match self.run_line(line_no, line) {
                Ok(Some(outcome)) => {
                    summary.executed += 1;
                    on_outcome(line_no, &outcome);
                }
                Ok(None) => {}
                Err(e) if keep_going => {
                    tracing::warn!("Line {} failed: {}", line_no, e);
                    summary.failures.push((line_no, e));
                }
                Err(e) => {
                    tracing::error!("Line {} failed: {}", line_no, e);
                    return Err(e);
                }
            }
        }

        tracing::debug!(
            "Script finished: {} executed, {} failed",
            summary.executed,
            summary.failures.len()
        );
        Ok(summary)
    }
}
