use std::fs::File;
use std::path::Path;

use super::{QueryExecutor, Reply};
use crate::error::{DbError, DbResult};
use crate::sql::ast::{InsertSource, InsertStatement};
use crate::sql::parser::trim_quotes;
use crate::storage::{generate_key, KeyValueStore};

impl<'a, S: KeyValueStore + ?Sized> QueryExecutor<'a, S> {
    pub(super) fn execute_insert(&self, insert: &InsertStatement) -> DbResult<Reply> {
        let keys = match &insert.source {
            InsertSource::Values { fields, values } => {
                vec![self.insert_values(&insert.target, fields, values)?]
            }
            InsertSource::Csv { fields, path } => self.insert_csv(&insert.target, fields, path)?,
        };
        Ok(Reply::Array(keys.into_iter().map(Reply::Bulk).collect()))
    }

    /// Create one record. Counts are checked before anything is written.
    fn insert_values(&self, target: &str, fields: &[String], values: &[String]) -> DbResult<String> {
        if fields.len() != values.len() {
            return Err(DbError::ValueCountMismatch {
                fields: fields.len(),
                values: values.len(),
            });
        }

        let key = generate_key(target);
        // Not atomic: a failed write leaves the earlier fields in place
        for (field, value) in fields.iter().zip(values) {
            self.store.set_field(&key, field, value)?;
        }
        Ok(key)
    }

    /// Bulk load one record per CSV line.
    ///
    /// Without inline field names the first line supplies them. A short line
    /// aborts the load; records created before it stay.
    fn insert_csv(&self, target: &str, fields: &[String], path: &Path) -> DbResult<Vec<String>> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DbError::FileNotFound(path.display().to_string()),
            _ => DbError::IoError(e),
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut fields: Vec<String> = fields.to_vec();
        let mut keys = Vec::new();

        for (line, record) in reader.records().enumerate() {
            let record = record?;
            if fields.is_empty() {
                fields = record.iter().map(|f| trim_quotes(f).to_string()).collect();
                tracing::debug!("CSV header from {}: {:?}", path.display(), fields);
                continue;
            }

            if record.len() < fields.len() {
                tracing::warn!(
                    "CSV line {} of {} has {} values for {} fields, aborting",
                    line + 1,
                    path.display(),
                    record.len(),
                    fields.len()
                );
                return Err(DbError::ValueCountMismatch {
                    fields: fields.len(),
                    values: record.len(),
                });
            }

            let key = generate_key(target);
            for (field, value) in fields.iter().zip(record.iter()) {
                self.store.set_field(&key, field, trim_quotes(value))?;
            }
            keys.push(key);
        }

        tracing::info!("Loaded {} records from {} into {}", keys.len(), path.display(), target);
        Ok(keys)
    }
}
