//! Script Module
//!
//! A line-oriented front end over the [`Engine`](crate::Engine) façade.
//!
//! Each non-blank, non-comment line is one command, translated into exactly
//! one engine call. Values are read by a fixed literal grammar; nothing in a
//! script is ever evaluated.
//!
//! ```
//! use elementaldb::script::{parse_line, Statement};
//!
//! let statement = parse_line("select users [*]").unwrap();
//! assert_eq!(
//!     statement,
//!     Some(Statement::Select { table: "users".into(), id: None })
//! );
//! ```

mod literal;
mod parser;
mod runner;

pub use parser::{parse_line, Statement};
pub use runner::{Outcome, ScriptRunner, ScriptSummary};
