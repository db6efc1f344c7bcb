//! Tests for foreign keys and relations
//!
//! These tests verify:
//! - Writes into foreign-key columns must reference live rows
//! - Cascade and restrict delete policies, including chains
//! - Relation declaration errors
//! - Relations survive a restart

use elementaldb::record::row;
use elementaldb::{ColumnType, DeletePolicy, ElementalError, Engine, Table, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

/// users ← posts ← comments
fn setup_blog(temp_dir: &TempDir) -> Engine {
    let engine = Engine::open_path(temp_dir.path()).unwrap();
    engine
        .create_table(Table::new("users").column("name", ColumnType::Text))
        .unwrap();
    engine
        .create_table(
            Table::new("posts")
                .column("title", ColumnType::Text)
                .column("user_id", ColumnType::Integer)
                .foreign_key("user_id", "users"),
        )
        .unwrap();
    engine
        .create_table(
            Table::new("comments")
                .column("body", ColumnType::Text)
                .column("post_id", ColumnType::Integer)
                .foreign_key("post_id", "posts"),
        )
        .unwrap();
    engine
}

fn add_user(engine: &Engine, name: &str) -> u64 {
    engine.add("users", row([("name", Value::from(name))])).unwrap()
}

fn add_post(engine: &Engine, title: &str, user_id: u64) -> u64 {
    engine
        .add(
            "posts",
            row([("title", Value::from(title)), ("user_id", Value::from(user_id))]),
        )
        .unwrap()
}

fn add_comment(engine: &Engine, body: &str, post_id: u64) -> u64 {
    engine
        .add(
            "comments",
            row([("body", Value::from(body)), ("post_id", Value::from(post_id))]),
        )
        .unwrap()
}

// =============================================================================
// Write Enforcement Tests
// =============================================================================

#[test]
fn test_missing_reference_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let engine = setup_blog(&temp_dir);

    let result = engine.add(
        "posts",
        row([("title", Value::from("orphan")), ("user_id", Value::Int(99))]),
    );

    assert!(matches!(result, Err(ElementalError::ForeignKeyViolation(_))));
    assert!(engine.get_all("posts").unwrap().is_empty());
    assert_eq!(engine.buffered_len(), 0);
}

#[test]
fn test_null_reference_is_allowed() {
    let temp_dir = TempDir::new().unwrap();
    let engine = setup_blog(&temp_dir);

    let id = engine
        .add(
            "posts",
            row([("title", Value::from("draft")), ("user_id", Value::Null)]),
        )
        .unwrap();
    assert_eq!(engine.get("posts", id).unwrap().get("user_id"), Some(Value::Null));
}

#[test]
fn test_non_id_reference_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let engine = setup_blog(&temp_dir);
    add_user(&engine, "ann");

    for bad in [Value::from("1"), Value::Int(0), Value::Int(-1), Value::Float(1.0)] {
        let result = engine.add(
            "posts",
            row([("title", Value::from("t")), ("user_id", bad)]),
        );
        assert!(matches!(result, Err(ElementalError::ForeignKeyViolation(_))));
    }
}

#[test]
fn test_update_checks_references() {
    let temp_dir = TempDir::new().unwrap();
    let engine = setup_blog(&temp_dir);
    let ann = add_user(&engine, "ann");
    let post = add_post(&engine, "hello", ann);

    let result = engine.update("posts", post, row([("user_id", Value::Int(42))]));
    assert!(matches!(result, Err(ElementalError::ForeignKeyViolation(_))));
    assert_eq!(
        engine.get("posts", post).unwrap().get("user_id"),
        Some(Value::from(ann))
    );
}

#[test]
fn test_reference_to_deleted_row_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let engine = setup_blog(&temp_dir);
    let ann = add_user(&engine, "ann");
    engine.flush().unwrap();
    engine.delete("users", ann).unwrap();

    // The index still holds the id; the shard re-check must catch it
    let result = engine.add(
        "posts",
        row([("title", Value::from("late")), ("user_id", Value::from(ann))]),
    );
    assert!(matches!(result, Err(ElementalError::ForeignKeyViolation(_))));
}

#[test]
fn test_reference_to_undeclared_table() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();
    engine
        .create_table(
            Table::new("posts")
                .column("user_id", ColumnType::Integer)
                .foreign_key("user_id", "users"),
        )
        .unwrap();

    let result = engine.add("posts", row([("user_id", Value::Int(1))]));
    assert!(matches!(result, Err(ElementalError::NotFound(_))));
}

// =============================================================================
// Delete Policy Tests
// =============================================================================

#[test]
fn test_delete_without_relation_leaves_children() {
    let temp_dir = TempDir::new().unwrap();
    let engine = setup_blog(&temp_dir);
    let ann = add_user(&engine, "ann");
    let post = add_post(&engine, "hello", ann);

    engine.delete("users", ann).unwrap();
    assert!(engine.get("posts", post).is_ok());
}

#[test]
fn test_cascade_removes_children() {
    let temp_dir = TempDir::new().unwrap();
    let engine = setup_blog(&temp_dir);
    engine
        .declare_relation("users", "posts", DeletePolicy::Cascade)
        .unwrap();

    let ann = add_user(&engine, "ann");
    let bob = add_user(&engine, "bob");
    let p1 = add_post(&engine, "one", ann);
    let p2 = add_post(&engine, "two", ann);
    let p3 = add_post(&engine, "three", bob);
    engine.flush().unwrap();

    let outcome = engine.delete("users", ann).unwrap();
    assert_eq!(
        outcome.cascaded(),
        &[("posts".to_string(), p1), ("posts".to_string(), p2)]
    );

    assert!(matches!(engine.get("posts", p1), Err(ElementalError::NotFound(_))));
    assert!(matches!(engine.get("posts", p2), Err(ElementalError::NotFound(_))));
    assert!(engine.get("posts", p3).is_ok());
    assert!(engine.get("users", bob).is_ok());
}

#[test]
fn test_restrict_blocks_delete() {
    let temp_dir = TempDir::new().unwrap();
    let engine = setup_blog(&temp_dir);
    engine
        .declare_relation("users", "posts", DeletePolicy::Restrict)
        .unwrap();

    let ann = add_user(&engine, "ann");
    let post = add_post(&engine, "hello", ann);

    let result = engine.delete("users", ann);
    assert!(matches!(result, Err(ElementalError::ForeignKeyViolation(_))));
    assert!(engine.get("users", ann).is_ok());
    assert!(engine.get("posts", post).is_ok());

    // Once the child is gone the parent can be deleted
    engine.delete("posts", post).unwrap();
    engine.delete("users", ann).unwrap();
}

#[test]
fn test_cascade_chain() {
    let temp_dir = TempDir::new().unwrap();
    let engine = setup_blog(&temp_dir);
    engine
        .declare_relation("users", "posts", DeletePolicy::Cascade)
        .unwrap();
    engine
        .declare_relation("posts", "comments", DeletePolicy::Cascade)
        .unwrap();

    let ann = add_user(&engine, "ann");
    let post = add_post(&engine, "hello", ann);
    let c1 = add_comment(&engine, "first", post);
    let c2 = add_comment(&engine, "second", post);

    let outcome = engine.delete("users", ann).unwrap();
    assert_eq!(outcome.removed.len(), 4);
    assert!(engine.get_all("posts").unwrap().is_empty());
    assert!(matches!(engine.get("comments", c1), Err(ElementalError::NotFound(_))));
    assert!(matches!(engine.get("comments", c2), Err(ElementalError::NotFound(_))));
}

#[test]
fn test_restrict_deep_in_chain_blocks_cascade() {
    let temp_dir = TempDir::new().unwrap();
    let engine = setup_blog(&temp_dir);
    engine
        .declare_relation("users", "posts", DeletePolicy::Cascade)
        .unwrap();
    engine
        .declare_relation("posts", "comments", DeletePolicy::Restrict)
        .unwrap();

    let ann = add_user(&engine, "ann");
    let post = add_post(&engine, "hello", ann);
    add_comment(&engine, "pinned", post);

    let result = engine.delete("users", ann);
    assert!(matches!(result, Err(ElementalError::ForeignKeyViolation(_))));
    assert!(engine.get("users", ann).is_ok());
    assert!(engine.get("posts", post).is_ok());
    assert_eq!(engine.get_all("comments").unwrap().len(), 1);
}

// =============================================================================
// Declaration Tests
// =============================================================================

#[test]
fn test_declare_relation_errors() {
    let temp_dir = TempDir::new().unwrap();
    let engine = setup_blog(&temp_dir);

    assert!(matches!(
        engine.declare_relation("users", "ghosts", DeletePolicy::Cascade),
        Err(ElementalError::NotFound(_))
    ));
    assert!(matches!(
        engine.declare_relation("ghosts", "posts", DeletePolicy::Cascade),
        Err(ElementalError::NotFound(_))
    ));
    // comments has no column referencing users
    assert!(matches!(
        engine.declare_relation("users", "comments", DeletePolicy::Cascade),
        Err(ElementalError::SchemaMismatch(_))
    ));
    assert!(engine.relation("users").is_none());
}

#[test]
fn test_last_declared_relation_wins() {
    let temp_dir = TempDir::new().unwrap();
    let engine = setup_blog(&temp_dir);

    engine
        .declare_relation("users", "posts", DeletePolicy::Cascade)
        .unwrap();
    engine
        .declare_relation("users", "posts", DeletePolicy::Restrict)
        .unwrap();

    assert_eq!(
        engine.relation("users").unwrap().on_delete,
        DeletePolicy::Restrict
    );
}

#[test]
fn test_replace_table_drops_its_relations() {
    let temp_dir = TempDir::new().unwrap();
    let engine = setup_blog(&temp_dir);
    engine
        .declare_relation("users", "posts", DeletePolicy::Cascade)
        .unwrap();

    engine
        .replace_table(Table::new("posts").column("title", ColumnType::Text))
        .unwrap();
    assert!(engine.relation("users").is_none());
}

#[test]
fn test_relations_survive_restart() {
    let temp_dir = TempDir::new().unwrap();
    let (ann, post) = {
        let engine = setup_blog(&temp_dir);
        engine
            .declare_relation("users", "posts", DeletePolicy::Cascade)
            .unwrap();
        let ann = add_user(&engine, "ann");
        let post = add_post(&engine, "hello", ann);
        engine.close().unwrap();
        (ann, post)
    };

    let engine = Engine::open_path(temp_dir.path()).unwrap();
    assert_eq!(
        engine.relation("users").unwrap().on_delete,
        DeletePolicy::Cascade
    );
    engine.delete("users", ann).unwrap();
    assert!(matches!(engine.get("posts", post), Err(ElementalError::NotFound(_))));
}
