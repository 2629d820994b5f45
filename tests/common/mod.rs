//! Common test utilities for dbx statement tests
//!
//! Provides shared helper functions for:
//! - Creating seeded in-memory stores
//! - Running statements and unpacking replies
//! - A store wrapper that records field reads
//! - A store wrapper that fails one operation

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use dbx::sql::OrderSpec;
use dbx::{execute_command, parse, DbError, DbResult, Limits, MemoryStore, QueryExecutor, Reply};
use dbx::KeyValueStore;

pub fn create_seeded_store() -> MemoryStore {
    let store = MemoryStore::with_page_size(3);
    store.insert_record("user:1", &[("name", "Alice"), ("age", "30")]);
    store.insert_record("user:2", &[("name", "Bob"), ("age", "25")]);
    store
}

pub fn create_people_store() -> MemoryStore {
    let store = MemoryStore::with_page_size(4);
    let people = [
        ("person:1", "Alice", "30", "eng"),
        ("person:2", "Bob", "25", "eng"),
        ("person:3", "Charlie", "35", "sales"),
        ("person:4", "Diana", "30", "marketing"),
        ("person:5", "Eve", "25", "sales"),
        ("person:6", "alice", "41", "eng"),
    ];
    for (key, name, age, dept) in people {
        store.insert_record(key, &[("name", name), ("age", age), ("dept", dept)]);
    }
    store.insert_record("product:1", &[("name", "Widget"), ("price", "29.99")]);
    store
}

pub fn execute(store: &MemoryStore, line: &str) -> Reply {
    try_execute(store, line).unwrap_or_else(|e| panic!("Failed to execute {}: {}", line, e))
}

pub fn try_execute(store: &MemoryStore, line: &str) -> DbResult<Reply> {
    let statement = parse(line, &Limits::default())?;
    QueryExecutor::new(store).execute(&statement)
}

pub fn execute_words(store: &MemoryStore, argv: &[&str]) -> DbResult<Reply> {
    execute_command(store, argv, &Limits::default())
}

/// Rows of a SELECT reply as plain strings, nulls shown as "(nil)"
pub fn rows(reply: &Reply) -> Vec<Vec<String>> {
    reply
        .as_array()
        .iter()
        .map(|row| {
            row.as_array()
                .iter()
                .map(|item| item.as_str().unwrap_or("(nil)").to_string())
                .collect()
        })
        .collect()
}

/// Values of `field` in each row of a SELECT with named projections
pub fn column(reply: &Reply, field: &str) -> Vec<String> {
    rows(reply)
        .into_iter()
        .filter_map(|row| {
            row.chunks(2)
                .find(|pair| pair[0] == field)
                .and_then(|pair| pair.get(1).cloned())
        })
        .collect()
}

/// Store wrapper counting `get_field` calls per field name
pub struct CountingStore<'a> {
    pub inner: &'a MemoryStore,
    pub reads: parking_lot::Mutex<Vec<String>>,
    pub total: AtomicUsize,
}

impl<'a> CountingStore<'a> {
    pub fn new(inner: &'a MemoryStore) -> Self {
        Self {
            inner,
            reads: parking_lot::Mutex::new(Vec::new()),
            total: AtomicUsize::new(0),
        }
    }

    pub fn reads_of(&self, field: &str) -> usize {
        self.reads.lock().iter().filter(|f| *f == field).count()
    }
}

impl KeyValueStore for CountingStore<'_> {
    fn get_field(&self, key: &str, field: &str) -> DbResult<Option<String>> {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.reads.lock().push(field.to_string());
        self.inner.get_field(key, field)
    }

    fn get_all(&self, key: &str) -> DbResult<Vec<(String, String)>> {
        self.inner.get_all(key)
    }

    fn set_field(&self, key: &str, field: &str, value: &str) -> DbResult<()> {
        self.inner.set_field(key, field, value)
    }

    fn delete_key(&self, key: &str) -> DbResult<bool> {
        self.inner.delete_key(key)
    }

    fn exists(&self, key: &str) -> DbResult<bool> {
        self.inner.exists(key)
    }

    fn scan(&self, cursor: u64) -> DbResult<(u64, Vec<String>)> {
        self.inner.scan(cursor)
    }

    fn add_to_set(&self, set: &str, key: &str) -> DbResult<()> {
        self.inner.add_to_set(set, key)
    }

    fn delete_set(&self, set: &str) -> DbResult<()> {
        self.inner.delete_set(set)
    }

    fn sort_set(&self, set: &str, specs: &[OrderSpec]) -> DbResult<Vec<String>> {
        self.inner.sort_set(set, specs)
    }
}

/// Which store operation `FailingStore` should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    SortSet,
    GetAll,
}

/// Store wrapper that returns a store error from one operation
pub struct FailingStore<'a> {
    pub inner: &'a MemoryStore,
    pub fail_on: FailOn,
}

impl<'a> FailingStore<'a> {
    pub fn new(inner: &'a MemoryStore, fail_on: FailOn) -> Self {
        Self { inner, fail_on }
    }

    fn fail_if(&self, op: FailOn) -> DbResult<()> {
        if self.fail_on == op {
            return Err(DbError::StoreError(format!("{:?} unavailable", op)));
        }
        Ok(())
    }
}

impl KeyValueStore for FailingStore<'_> {
    fn get_field(&self, key: &str, field: &str) -> DbResult<Option<String>> {
        self.inner.get_field(key, field)
    }

    fn get_all(&self, key: &str) -> DbResult<Vec<(String, String)>> {
        self.fail_if(FailOn::GetAll)?;
        self.inner.get_all(key)
    }

    fn set_field(&self, key: &str, field: &str, value: &str) -> DbResult<()> {
        self.inner.set_field(key, field, value)
    }

    fn delete_key(&self, key: &str) -> DbResult<bool> {
        self.inner.delete_key(key)
    }

    fn exists(&self, key: &str) -> DbResult<bool> {
        self.inner.exists(key)
    }

    fn scan(&self, cursor: u64) -> DbResult<(u64, Vec<String>)> {
        self.inner.scan(cursor)
    }

    fn add_to_set(&self, set: &str, key: &str) -> DbResult<()> {
        self.inner.add_to_set(set, key)
    }

    fn delete_set(&self, set: &str) -> DbResult<()> {
        self.inner.delete_set(set)
    }

    fn sort_set(&self, set: &str, specs: &[OrderSpec]) -> DbResult<Vec<String>> {
        self.fail_if(FailOn::SortSet)?;
        self.inner.sort_set(set, specs)
    }
}
