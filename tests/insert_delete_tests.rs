//! INSERT and DELETE Statement Tests
//!
//! Tests for the mutating statements, covering:
//! - INSERT ... VALUES and key generation
//! - CSV bulk load with and without inline field names
//! - Value count mismatches
//! - DELETE with and without WHERE

mod common;

use common::*;
use dbx::{DbError, KeyValueStore, MemoryStore, Reply};
use tempfile::TempDir;

fn inserted_keys(reply: &Reply) -> Vec<String> {
    reply
        .as_array()
        .iter()
        .map(|k| k.as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// INSERT ... VALUES
// ============================================================================

#[test]
fn test_insert_values_then_select() {
    let store = MemoryStore::new();
    let reply = execute(&store, "insert into phonebook (name,phone) values ('Peter Nelson',555-1234)");
    let keys = inserted_keys(&reply);
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("phonebook:"));

    let reply = execute(&store, "select name,phone from ^phonebook:");
    assert_eq!(
        rows(&reply),
        vec![vec!["name", "Peter Nelson", "phone", "555-1234"]]
    );
}

#[test]
fn test_insert_generates_distinct_keys() {
    let store = MemoryStore::new();
    let mut keys = Vec::new();
    for i in 0..20 {
        let reply = execute(&store, &format!("insert into n (v) values ({})", i));
        keys.extend(inserted_keys(&reply));
    }
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 20);
    assert_eq!(store.len(), 20);
}

#[test]
fn test_insert_value_count_mismatch_writes_nothing() {
    let store = MemoryStore::new();
    let result = try_execute(&store, "insert into p (a,b,c) values (1,2)");
    assert!(matches!(
        result,
        Err(DbError::ValueCountMismatch {
            fields: 3,
            values: 2
        })
    ));
    assert!(store.is_empty());
}

#[test]
fn test_insert_word_by_word() {
    let store = MemoryStore::new();
    let reply = execute_words(
        &store,
        &["insert", "into", "city", "(name)", "values", "(New York)"],
    )
    .unwrap();
    let key = &inserted_keys(&reply)[0];
    assert_eq!(store.get_field(key, "name").unwrap(), Some("New York".to_string()));
}

// ============================================================================
// INSERT from CSV
// ============================================================================

#[test]
fn test_insert_csv_with_header_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("people.csv");
    std::fs::write(&path, "name,age\nAlice,30\nBob,25\n'Carol',\"41\"\n").unwrap();

    let store = MemoryStore::new();
    let reply = execute(&store, &format!("insert into people from {}", path.display()));
    assert_eq!(inserted_keys(&reply).len(), 3);

    let reply = execute(&store, "select name from ^people: where age>=30 order by name");
    assert_eq!(column(&reply, "name"), vec!["Alice", "Carol"]);
}

#[test]
fn test_insert_csv_with_inline_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rows.csv");
    std::fs::write(&path, "Alice,30,extra\nBob,25\n").unwrap();

    let store = MemoryStore::new();
    let reply = execute(&store, &format!("insert into p (name,age) csv {}", path.display()));
    let keys = inserted_keys(&reply);
    assert_eq!(keys.len(), 2);
    // Values beyond the field list are ignored
    assert_eq!(store.get_all(&keys[0]).unwrap().len(), 2);
}

#[test]
fn test_insert_csv_short_line_aborts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short.csv");
    std::fs::write(&path, "a,b\n1,2\n3\n4,5\n").unwrap();

    let store = MemoryStore::new();
    let result = try_execute(&store, &format!("insert into t from {}", path.display()));
    assert!(matches!(result, Err(DbError::ValueCountMismatch { .. })));
    // The record before the short line stays
    assert_eq!(store.len(), 1);
}

#[test]
fn test_insert_csv_missing_file() {
    let store = MemoryStore::new();
    let result = try_execute(&store, "insert into t from /no/such/file.csv");
    assert!(matches!(result, Err(DbError::FileNotFound(_))));
}

// ============================================================================
// DELETE
// ============================================================================

#[test]
fn test_delete_with_where() {
    let store = create_seeded_store();
    assert_eq!(
        execute(&store, "delete from ^user: where name=Bob"),
        Reply::Integer(1)
    );
    assert!(!store.exists("user:2").unwrap());
    assert!(store.exists("user:1").unwrap());
}

#[test]
fn test_delete_all_matching_across_pages() {
    let store = create_people_store();
    assert_eq!(execute(&store, "delete from ^person:"), Reply::Integer(6));
    assert_eq!(store.keys(), vec!["product:1"]);
}

#[test]
fn test_delete_nothing_matches() {
    let store = create_seeded_store();
    assert_eq!(execute(&store, "delete from ^ghost:"), Reply::Integer(0));
    assert_eq!(store.len(), 2);
}

#[test]
fn test_delete_rejects_order_by() {
    let store = create_seeded_store();
    let result = try_execute(&store, "delete from ^user: where age>1 order by age");
    assert!(matches!(result, Err(DbError::ParseError(_))));
    assert_eq!(store.len(), 2);
}

// ============================================================================
// Full Scenario
// ============================================================================

#[test]
fn test_select_order_delete_scenario() {
    let store = create_seeded_store();

    let reply = execute(&store, "select name,age from ^user: where age>=30");
    assert_eq!(rows(&reply), vec![vec!["name", "Alice", "age", "30"]]);

    let reply = execute(&store, "select rowid() from ^user: order by age");
    let keys: Vec<String> = rows(&reply).into_iter().map(|r| r[1].clone()).collect();
    assert_eq!(keys, vec!["user:2", "user:1"]);

    assert_eq!(
        execute(&store, "delete from ^user: where name=Bob"),
        Reply::Integer(1)
    );
    assert!(!store.exists("user:2").unwrap());
}
