//! Cursor-driven key enumeration shared by SELECT and DELETE.
//!
//! Pages are fetched from cursor 0 until the store hands back cursor 0.
//! Nothing is snapshotted: keys written or removed between pages by other
//! callers may be seen zero times, once, or again under a new position.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::DbResult;
use crate::sql::{Pattern, Predicate};
use crate::storage::KeyValueStore;

/// Process-wide sequence for scratch set names
static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Pattern plus optional WHERE predicate
pub struct KeyFilter<'a> {
    pub pattern: &'a Pattern,
    pub predicate: Option<&'a Predicate>,
}

impl<'a> KeyFilter<'a> {
    pub fn new(pattern: &'a Pattern, predicate: Option<&'a Predicate>) -> Self {
        Self { pattern, predicate }
    }

    /// Pattern first, so non-matching keys never cost a store read
    pub fn accepts<S: KeyValueStore + ?Sized>(&self, store: &S, key: &str) -> DbResult<bool> {
        if !self.pattern.matches(key) {
            return Ok(false);
        }
        match self.predicate {
            Some(predicate) => predicate.evaluate(store, key),
            None => Ok(true),
        }
    }
}

/// Walk every page, handing accepted keys to `visit`.
///
/// Stops early when `visit` breaks; the remaining keys of the page and any
/// later pages are abandoned. Returns the number of keys visited.
pub fn scan_matching<S, F>(store: &S, filter: &KeyFilter<'_>, mut visit: F) -> DbResult<usize>
where
    S: KeyValueStore + ?Sized,
    F: FnMut(&str) -> DbResult<ControlFlow<()>>,
{
    let mut cursor = 0;
    let mut visited = 0;
    let mut pages = 0;

    loop {
        let (next, keys) = store.scan(cursor)?;
        pages += 1;

        for key in &keys {
            if !filter.accepts(store, key)? {
                continue;
            }
            visited += 1;
            if visit(key)?.is_break() {
                tracing::debug!("Scan stopped early after {} pages, {} keys", pages, visited);
                return Ok(visited);
            }
        }

        if next == 0 {
            break;
        }
        cursor = next;
    }

    tracing::debug!("Scan finished: {} pages, {} matching keys", pages, visited);
    Ok(visited)
}

/// Named scratch set in the store, removed when dropped.
///
/// Names combine the process id and a process-wide sequence, so concurrent
/// statements in one process never share a set.
pub struct ScratchSet<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
    name: String,
}

impl<'a, S: KeyValueStore + ?Sized> ScratchSet<'a, S> {
    pub fn create(store: &'a S) -> DbResult<Self> {
        let seq = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = format!("__db_tempset_{}_{}", std::process::id(), seq);
        // Clear any leftover from a crashed process with a recycled pid
        store.delete_set(&name)?;
        Ok(Self { store, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&self, key: &str) -> DbResult<()> {
        self.store.add_to_set(&self.name, key)
    }
}

impl<S: KeyValueStore + ?Sized> Drop for ScratchSet<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.store.delete_set(&self.name) {
            tracing::warn!("Failed to remove scratch set {}: {}", self.name, e);
        }
    }
}
