//! Tests for shard files
//!
//! These tests verify:
//! - Shard routing matches the file layout
//! - Shard file encoding through the public codec
//! - Corrupt shard files are reset on load
//! - Tables sharing a shard keep independent ids

use std::fs;

use elementaldb::record::{row, Record};
use elementaldb::storage::{decode_shard, encode_shard, ShardData, ShardId, ShardRouter, TableData};
use elementaldb::{ColumnType, Config, ElementalError, Engine, Table, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn notes_table(name: &str) -> Table {
    Table::new(name).column("text", ColumnType::Text)
}

fn note(text: &str) -> elementaldb::Row {
    row([("text", Value::from(text))])
}

fn shard_file(engine: &Engine, table: &str) -> std::path::PathBuf {
    engine
        .shard_dir()
        .join(format!("{}.db", engine.shard_for(table)))
}

/// Two distinct table names that route to the same shard
fn colliding_names(router: &ShardRouter) -> (String, String) {
    let first = "t0".to_string();
    let target = router.shard_for(&first);
    let second = (1..)
        .map(|i| format!("t{}", i))
        .find(|name| router.shard_for(name) == target)
        .unwrap();
    (first, second)
}

// =============================================================================
// Routing Tests
// =============================================================================

#[test]
fn test_routing_matches_file_layout() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();
    engine.create_table(notes_table("notes")).unwrap();
    engine.add("notes", note("hi")).unwrap();
    engine.flush().unwrap();

    let router = ShardRouter::new(engine.shard_count());
    assert_eq!(router.shard_for("notes"), engine.shard_for("notes"));
    assert!(shard_file(&engine, "notes").exists());
}

#[test]
fn test_ensure_shard_creates_empty_file() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();

    let path = engine.shard_dir().join("shard_002.db");
    assert!(!path.exists());
    engine.ensure_shard(ShardId(2)).unwrap();

    let data = decode_shard(ShardId(2), &fs::read(&path).unwrap()).unwrap();
    assert!(data.tables.is_empty());

    assert!(matches!(
        engine.ensure_shard(ShardId(3)),
        Err(ElementalError::NotFound(_))
    ));
}

#[test]
fn test_tables_sharing_a_shard_keep_own_ids() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();
    let (a, b) = colliding_names(&ShardRouter::new(engine.shard_count()));

    engine.create_table(notes_table(&a)).unwrap();
    engine.create_table(notes_table(&b)).unwrap();
    assert_eq!(engine.add(&a, note("a1")).unwrap(), 1);
    assert_eq!(engine.add(&b, note("b1")).unwrap(), 1);
    engine.flush().unwrap();

    assert_eq!(engine.get(&a, 1).unwrap().fields, note("a1"));
    assert_eq!(engine.get(&b, 1).unwrap().fields, note("b1"));
}

// =============================================================================
// Codec Tests
// =============================================================================

#[test]
fn test_persisted_file_decodes_to_flushed_records() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();
    engine.create_table(notes_table("notes")).unwrap();
    for text in ["x", "y", "z"] {
        engine.add("notes", note(text)).unwrap();
    }
    engine.delete("notes", 3).unwrap();
    engine.flush().unwrap();

    let bytes = fs::read(shard_file(&engine, "notes")).unwrap();
    let data = decode_shard(engine.shard_for("notes"), &bytes).unwrap();
    let notes = &data.tables["notes"];

    assert_eq!(notes.next_id, 4);
    assert_eq!(
        notes.records,
        vec![Record::new(1, note("x")), Record::new(2, note("y"))]
    );

    // Re-encoding yields the same bytes
    assert_eq!(encode_shard(&data).unwrap(), bytes);
}

#[test]
fn test_decode_rejects_garbage() {
    for bytes in [&b""[..], &b"ELDS"[..], &b"not a shard file at all"[..]] {
        assert!(matches!(
            decode_shard(ShardId(0), bytes),
            Err(ElementalError::CorruptShard { .. })
        ));
    }
}

#[test]
fn test_decode_rejects_unsorted_records() {
    let mut data = ShardData::default();
    data.tables.insert(
        "notes".to_string(),
        TableData {
            next_id: 3,
            records: vec![Record::new(2, note("b")), Record::new(1, note("a"))],
        },
    );
    let bytes = encode_shard(&data).unwrap();

    assert!(matches!(
        decode_shard(ShardId(0), &bytes),
        Err(ElementalError::CorruptShard { .. })
    ));
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_corrupt_shard_is_reset_on_open() {
    let temp_dir = TempDir::new().unwrap();
    let path = {
        let engine = Engine::open_path(temp_dir.path()).unwrap();
        engine.create_table(notes_table("notes")).unwrap();
        engine.add("notes", note("lost")).unwrap();
        let path = shard_file(&engine, "notes");
        engine.close().unwrap();
        path
    };

    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let engine = Engine::open_path(temp_dir.path()).unwrap();
    assert!(matches!(engine.get("notes", 1), Err(ElementalError::NotFound(_))));
    assert_eq!(engine.shard_recoveries(), 1);

    // The reset was persisted and the shard is usable again
    let data = decode_shard(engine.shard_for("notes"), &fs::read(&path).unwrap()).unwrap();
    assert!(data.tables.is_empty());
    assert_eq!(engine.add("notes", note("fresh")).unwrap(), 1);
}

#[test]
fn test_truncated_shard_is_reset() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    let path = {
        let engine = Engine::open(config.clone()).unwrap();
        engine.create_table(notes_table("notes")).unwrap();
        engine.add("notes", note("lost")).unwrap();
        engine.flush().unwrap();
        shard_file(&engine, "notes")
    };

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    let engine = Engine::open(config).unwrap();
    assert!(engine.get_all("notes").unwrap().is_empty());
    assert_eq!(engine.shard_recoveries(), 1);
}
