use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use super::engine::KeyValueStore;
use crate::error::{DbError, DbResult};
use crate::sql::ast::{Direction, OrderSpec};

/// Default number of keys per scan page
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone)]
struct Record {
    /// Insertion sequence, doubles as the scan position
    seq: u64,
    fields: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, Record>,
    by_seq: BTreeMap<u64, String>,
    sets: HashMap<String, BTreeSet<String>>,
    next_seq: u64,
}

impl Inner {
    fn allocate_seq(&mut self) -> u64 {
        // Cursor 0 is reserved for "start" and "done"
        self.next_seq += 1;
        self.next_seq
    }
}

/// Serialized form of one record in a snapshot file
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRecord {
    key: String,
    fields: Vec<(String, String)>,
}

/// In-process key/field store.
///
/// Scan cursors are insertion sequence numbers, so deleting a key during a
/// scan never shifts keys that have not been visited yet. A key deleted and
/// re-created gets a new sequence number and may be seen twice by a scan
/// that straddles both events.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            page_size: page_size.max(1),
        }
    }

    /// Insert a whole record, replacing any fields of the same name
    pub fn insert_record(&self, key: &str, fields: &[(&str, &str)]) {
        for (field, value) in fields {
            self.write_field(key, field, value);
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys in scan order
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().by_seq.values().cloned().collect()
    }

    /// Number of named sets currently held
    pub fn set_count(&self) -> usize {
        self.inner.read().sets.len()
    }

    fn write_field(&self, key: &str, field: &str, value: &str) {
        let mut inner = self.inner.write();
        if let Some(record) = inner.records.get_mut(key) {
            match record.fields.iter_mut().find(|(name, _)| name == field) {
                Some(slot) => slot.1 = value.to_string(),
                None => record.fields.push((field.to_string(), value.to_string())),
            }
            return;
        }

        let seq = inner.allocate_seq();
        inner.by_seq.insert(seq, key.to_string());
        inner.records.insert(
            key.to_string(),
            Record {
                seq,
                fields: vec![(field.to_string(), value.to_string())],
            },
        );
    }

    /// Load a store from a JSON snapshot. A missing file yields an empty store.
    pub fn load<P: AsRef<Path>>(path: P, page_size: usize) -> DbResult<Self> {
        let store = Self::with_page_size(page_size);
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("Snapshot {} not found, starting empty", path.display());
            return Ok(store);
        }

        let file = std::fs::File::open(path)?;
        let records: Vec<SnapshotRecord> = serde_json::from_reader(std::io::BufReader::new(file))?;
        for record in &records {
            for (field, value) in &record.fields {
                store.write_field(&record.key, field, value);
            }
        }
        tracing::info!("Loaded {} records from {}", records.len(), path.display());
        Ok(store)
    }

    /// Write all records to a JSON snapshot, in scan order
    pub fn save<P: AsRef<Path>>(&self, path: P) -> DbResult<()> {
        let records: Vec<SnapshotRecord> = {
            let inner = self.inner.read();
            inner
                .by_seq
                .values()
                .filter_map(|key| {
                    inner.records.get(key).map(|record| SnapshotRecord {
                        key: key.clone(),
                        fields: record.fields.clone(),
                    })
                })
                .collect()
        };

        let file = std::fs::File::create(path.as_ref())?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &records)?;
        tracing::debug!("Saved {} records to {}", records.len(), path.as_ref().display());
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get_field(&self, key: &str, field: &str) -> DbResult<Option<String>> {
        let inner = self.inner.read();
        Ok(inner.records.get(key).and_then(|record| {
            record
                .fields
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, value)| value.clone())
        }))
    }

    fn get_all(&self, key: &str) -> DbResult<Vec<(String, String)>> {
        let inner = self.inner.read();
        Ok(inner
            .records
            .get(key)
            .map(|record| record.fields.clone())
            .unwrap_or_default())
    }

    fn set_field(&self, key: &str, field: &str, value: &str) -> DbResult<()> {
        if key.is_empty() {
            return Err(DbError::StoreError("empty key".to_string()));
        }
        self.write_field(key, field, value);
        Ok(())
    }

    fn delete_key(&self, key: &str) -> DbResult<bool> {
        let mut inner = self.inner.write();
        match inner.records.remove(key) {
            Some(record) => {
                inner.by_seq.remove(&record.seq);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn exists(&self, key: &str) -> DbResult<bool> {
        Ok(self.inner.read().records.contains_key(key))
    }

    fn scan(&self, cursor: u64) -> DbResult<(u64, Vec<String>)> {
        let inner = self.inner.read();
        let start = cursor.max(1);
        let mut keys = Vec::with_capacity(self.page_size);
        let mut last = None;

        for (seq, key) in inner.by_seq.range(start..).take(self.page_size) {
            keys.push(key.clone());
            last = Some(*seq);
        }

        let next = match last {
            Some(seq) if inner.by_seq.range(seq + 1..).next().is_some() => seq + 1,
            _ => 0,
        };
        Ok((next, keys))
    }

    fn add_to_set(&self, set: &str, key: &str) -> DbResult<()> {
        self.inner
            .write()
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(key.to_string());
        Ok(())
    }

    fn delete_set(&self, set: &str) -> DbResult<()> {
        self.inner.write().sets.remove(set);
        Ok(())
    }

    fn sort_set(&self, set: &str, specs: &[OrderSpec]) -> DbResult<Vec<String>> {
        let inner = self.inner.read();
        let Some(members) = inner.sets.get(set) else {
            return Ok(Vec::new());
        };

        // Resolve sort keys once; a missing field sorts as the empty string
        let mut rows: Vec<(String, Vec<String>)> = members
            .iter()
            .map(|key| {
                let values = specs
                    .iter()
                    .map(|spec| {
                        inner
                            .records
                            .get(key)
                            .and_then(|record| {
                                record
                                    .fields
                                    .iter()
                                    .find(|(name, _)| *name == spec.field)
                                    .map(|(_, value)| value.clone())
                            })
                            .unwrap_or_default()
                    })
                    .collect();
                (key.clone(), values)
            })
            .collect();

        rows.sort_by(|(_, a), (_, b)| {
            for (i, spec) in specs.iter().enumerate() {
                let ord = a[i].as_bytes().cmp(b[i].as_bytes());
                let ord = match spec.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        Ok(rows.into_iter().map(|(key, _)| key).collect())
    }
}
