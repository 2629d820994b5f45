//! Statement execution against a [`KeyValueStore`].
//!
//! SELECT without ORDER BY streams matches straight to the sink while
//! scanning. With ORDER BY, matches are first staged in a scratch set, the
//! store sorts that set, and the sorted keys are projected.

mod insert;
pub mod reply;
pub mod scan;
pub mod sink;

pub use reply::Reply;

use std::ops::ControlFlow;
use std::time::Instant;

use crate::error::DbResult;
use crate::sql::ast::{DeleteStatement, SelectStatement, Statement};
use crate::storage::KeyValueStore;
use scan::{scan_matching, KeyFilter, ScratchSet};
use sink::{project, Sink};

/// Executes parsed statements against one store
pub struct QueryExecutor<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> QueryExecutor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Run a statement to completion.
    ///
    /// SELECT and INSERT reply with an array, DELETE with the number of
    /// deleted keys.
    pub fn execute(&self, statement: &Statement) -> DbResult<Reply> {
        let start = Instant::now();
        let reply = match statement {
            Statement::Select(select) => self.execute_select(select)?,
            Statement::Insert(insert) => self.execute_insert(insert)?,
            Statement::Delete(delete) => self.execute_delete(delete)?,
        };

        let size = match &reply {
            Reply::Array(items) => items.len() as i64,
            Reply::Integer(n) => *n,
            _ => 0,
        };
        tracing::info!(
            "{} completed: {} results in {:?}",
            statement.kind().as_str(),
            size,
            start.elapsed()
        );
        Ok(reply)
    }

    fn execute_select(&self, select: &SelectStatement) -> DbResult<Reply> {
        let filter = KeyFilter::new(&select.source, select.predicate.as_ref());
        let mut sink = Sink::open(&select.sink)?;

        let rows = if select.order.is_empty() {
            tracing::debug!("Plan: unordered scan over {}", select.source);
            self.select_unordered(select, &filter, &mut sink)?
        } else {
            tracing::debug!(
                "Plan: ordered scan over {} by [{}]",
                select.source,
                select
                    .order
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            self.select_ordered(select, &filter, &mut sink)?
        };

        sink.finish()?;
        Ok(Reply::Array(rows))
    }

    fn select_unordered(
        &self,
        select: &SelectStatement,
        filter: &KeyFilter<'_>,
        sink: &mut Sink,
    ) -> DbResult<Vec<Reply>> {
        let mut rows = Vec::new();
        if select.limit == Some(0) {
            return Ok(rows);
        }

        scan_matching(self.store, filter, |key| {
            if sink.is_own_output(key) {
                return Ok(ControlFlow::Continue(()));
            }
            let row = project(self.store, key, &select.projection)?;
            if let Some(reply) = sink.emit(self.store, row)? {
                rows.push(reply);
            }

            match select.limit {
                Some(limit) if rows.len() >= limit => Ok(ControlFlow::Break(())),
                _ => Ok(ControlFlow::Continue(())),
            }
        })?;

        Ok(rows)
    }

    fn select_ordered(
        &self,
        select: &SelectStatement,
        filter: &KeyFilter<'_>,
        sink: &mut Sink,
    ) -> DbResult<Vec<Reply>> {
        // Dropped on every return path, which removes the set from the store
        let scratch = ScratchSet::create(self.store)?;

        let staged = scan_matching(self.store, filter, |key| {
            scratch.add(key)?;
            Ok(ControlFlow::Continue(()))
        })?;

        let mut rows = Vec::new();
        if staged == 0 {
            return Ok(rows);
        }

        let sorted = self.store.sort_set(scratch.name(), &select.order)?;
        tracing::debug!("Sorted {} staged keys in {}", sorted.len(), scratch.name());

        let limit = select.limit.unwrap_or(usize::MAX);
        for key in &sorted {
            if rows.len() >= limit {
                break;
            }
            let row = project(self.store, key, &select.projection)?;
            if let Some(reply) = sink.emit(self.store, row)? {
                rows.push(reply);
            }
        }

        Ok(rows)
    }

    fn execute_delete(&self, delete: &DeleteStatement) -> DbResult<Reply> {
        let filter = KeyFilter::new(&delete.source, delete.predicate.as_ref());
        let mut deleted = 0i64;

        scan_matching(self.store, &filter, |key| {
            if self.store.delete_key(key)? {
                deleted += 1;
            }
            Ok(ControlFlow::Continue(()))
        })?;

        Ok(Reply::Integer(deleted))
    }
}
