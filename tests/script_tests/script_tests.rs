//! Tests for the script front end
//!
//! These tests verify:
//! - Whole scripts run against a real engine
//! - Grammar errors carry their line number
//! - `keep_going` collects failures instead of stopping

use elementaldb::script::{parse_line, Outcome, ScriptRunner, Statement};
use elementaldb::{ElementalError, Engine, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const BLOG: &str = r#"
# two tables and a cascade between them
create table users schema [name, age:integer]
create table posts schema [title, user_id:integer] references [user_id -> users]
relate users -> posts cascade

add users ['ann', 31]
add users ["bob", null]
add posts ['hello', 1]
add posts ['again', 1]
add posts ['mine', 2]
update users [2] [age: 40]
"#;

fn run(engine: &Engine, text: &str) -> Vec<Outcome> {
    let mut outcomes = Vec::new();
    ScriptRunner::new(engine)
        .run_script(text, false, |_, outcome| outcomes.push(outcome.clone()))
        .unwrap();
    outcomes
}

// =============================================================================
// Execution Tests
// =============================================================================

#[test]
fn test_blog_script() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();

    let outcomes = run(&engine, BLOG);
    assert_eq!(outcomes.len(), 9);
    assert_eq!(
        outcomes[3],
        Outcome::Added {
            table: "users".into(),
            id: 1
        }
    );

    let bob = engine.get("users", 2).unwrap();
    assert_eq!(bob.get("name"), Some(Value::from("bob")));
    assert_eq!(bob.get("age"), Some(Value::Int(40)));

    let outcomes = run(&engine, "delete users [1]\nselect posts [*]");
    match &outcomes[0] {
        Outcome::Deleted(deleted) => assert_eq!(deleted.cascaded().len(), 2),
        other => panic!("unexpected outcome {:?}", other),
    }
    match &outcomes[1] {
        Outcome::Selected { records, .. } => {
            let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
            assert_eq!(ids, vec![3]);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_flush_and_select_by_id() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();
    run(&engine, BLOG);

    let outcomes = run(&engine, "flush\nselect users [1]");
    assert_eq!(outcomes[0], Outcome::Flushed(5));
    assert_eq!(outcomes[1].to_string(), r#"users#1 {age: 31, name: "ann"}"#);
    assert_eq!(engine.buffered_len(), 0);
}

#[test]
fn test_replace_table_from_script() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();
    run(&engine, BLOG);

    run(&engine, "replace table posts schema [title]");
    assert!(engine.get_all("posts").unwrap().is_empty());
    assert!(engine.relation("users").is_none());
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_grammar_error_names_line() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();
    let runner = ScriptRunner::new(&engine);

    let result = runner.run_script(
        "create table t schema [a]\n\nadd t [__import__('os')]\nadd t [1]",
        false,
        |_, _| {},
    );
    match result {
        Err(ElementalError::Script { line, .. }) => assert_eq!(line, 3),
        other => panic!("unexpected result {:?}", other.map(|s| s.executed)),
    }
    // Execution stopped at the bad line
    assert!(engine.get_all("t").unwrap().is_empty());
}

#[test]
fn test_engine_errors_pass_through() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();
    let runner = ScriptRunner::new(&engine);

    assert!(matches!(
        runner.run_line(1, "select ghosts [*]"),
        Err(ElementalError::NotFound(_))
    ));
    assert!(matches!(runner.run_line(2, "# nothing"), Ok(None)));
}

#[test]
fn test_keep_going_collects_failures() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();
    let runner = ScriptRunner::new(&engine);

    let script = "create table t schema [a]\nadd t [1]\nadd t [1, 2]\nbogus\nadd t [3]";
    let summary = runner.run_script(script, true, |_, _| {}).unwrap();

    assert_eq!(summary.executed, 3);
    let failed_lines: Vec<usize> = summary.failures.iter().map(|(line, _)| *line).collect();
    assert_eq!(failed_lines, vec![3, 4]);
    assert!(matches!(
        summary.failures[0].1,
        ElementalError::SchemaMismatch(_)
    ));
    assert!(matches!(summary.failures[1].1, ElementalError::Script { .. }));
    assert_eq!(engine.get_all("t").unwrap().len(), 2);
}

#[test]
fn test_parse_line_is_public() {
    assert_eq!(
        parse_line("relate a -> b restrict").unwrap(),
        Some(Statement::Relate {
            from: "a".into(),
            to: "b".into(),
            policy: elementaldb::DeletePolicy::Restrict,
        })
    );
}
