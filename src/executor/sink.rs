//! Projection of matched records and the sinks that consume them.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::reply::Reply;
use crate::error::DbResult;
use crate::sql::ast::{FieldSelector, SinkTarget};
use crate::storage::{generate_key, KeyValueStore};

/// One projected output entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectedField {
    /// Produced by `*`. Only the value is shown; the name is kept so the
    /// row can be written back as a record.
    Expanded { field: String, value: String },
    /// Produced by a named field or `rowid()`; `None` when the field is absent
    Named { name: String, value: Option<String> },
}

/// Project one record through the selector list, in declared order
pub fn project<S: KeyValueStore + ?Sized>(
    store: &S,
    key: &str,
    projection: &[FieldSelector],
) -> DbResult<Vec<ProjectedField>> {
    let mut out = Vec::new();
    for selector in projection {
        match selector {
            FieldSelector::Wildcard => {
                out.extend(
                    store
                        .get_all(key)?
                        .into_iter()
                        .map(|(field, value)| ProjectedField::Expanded { field, value }),
                );
            }
            FieldSelector::RowId => out.push(ProjectedField::Named {
                name: FieldSelector::ROWID.to_string(),
                value: Some(key.to_string()),
            }),
            FieldSelector::Field(name) => out.push(ProjectedField::Named {
                name: name.clone(),
                value: store.get_field(key, name)?,
            }),
        }
    }
    Ok(out)
}

/// Render one row as a single CSV line, without the line terminator
pub fn csv_line(row: &[ProjectedField]) -> DbResult<String> {
    let values = row.iter().map(|entry| match entry {
        ProjectedField::Expanded { value, .. } => value.as_str(),
        ProjectedField::Named { value, .. } => value.as_deref().unwrap_or(""),
    });

    let mut bytes = Vec::new();
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut bytes);
        writer.write_record(values)?;
        writer.flush()?;
    }

    let line = String::from_utf8_lossy(&bytes);
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Destination of projected rows for one statement
pub enum Sink {
    Display,
    MaterializeInto {
        prefix: String,
        created: HashSet<String>,
    },
    AppendCsv {
        path: PathBuf,
        writer: BufWriter<File>,
    },
}

impl Sink {
    /// Open the sink. CSV files are created if missing and appended to.
    pub fn open(target: &SinkTarget) -> DbResult<Self> {
        Ok(match target {
            SinkTarget::Display => Sink::Display,
            SinkTarget::MaterializeInto(prefix) => Sink::MaterializeInto {
                prefix: prefix.clone(),
                created: HashSet::new(),
            },
            SinkTarget::AppendCsv(path) => Sink::AppendCsv {
                path: path.clone(),
                writer: BufWriter::new(open_append(path)?),
            },
        })
    }

    /// Consume one row, returning what is reported upstream for it.
    ///
    /// Materializing a row with no present field writes nothing and reports
    /// nothing, so no key is generated for it.
    pub fn emit<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &S,
        row: Vec<ProjectedField>,
    ) -> DbResult<Option<Reply>> {
        match self {
            Sink::Display => {
                let mut items = Vec::with_capacity(row.len() * 2);
                for entry in row {
                    match entry {
                        ProjectedField::Expanded { value, .. } => items.push(Reply::Bulk(value)),
                        ProjectedField::Named { name, value } => {
                            items.push(Reply::Bulk(name));
                            items.push(value.map(Reply::Bulk).unwrap_or(Reply::Null));
                        }
                    }
                }
                Ok(Some(Reply::Array(items)))
            }
            Sink::MaterializeInto { prefix, created } => {
                let pairs: Vec<(&str, &str)> = row
                    .iter()
                    .filter_map(|entry| match entry {
                        ProjectedField::Expanded { field, value } => {
                            Some((field.as_str(), value.as_str()))
                        }
                        ProjectedField::Named { name, value } => {
                            value.as_deref().map(|value| (name.as_str(), value))
                        }
                    })
                    .collect();
                if pairs.is_empty() {
                    return Ok(None);
                }

                let key = generate_key(prefix);
                created.insert(key.clone());
                // Writes are not atomic: a failure leaves a partial record
                for (field, value) in pairs {
                    store.set_field(&key, field, value)?;
                }
                Ok(Some(Reply::Bulk(key)))
            }
            Sink::AppendCsv { writer, .. } => {
                let line = csv_line(&row)?;
                writeln!(writer, "{}", line)?;
                Ok(Some(Reply::Bulk(line)))
            }
        }
    }

    /// Whether `key` is a record this sink wrote during the statement.
    /// A scan must skip these or it could feed on its own output.
    pub fn is_own_output(&self, key: &str) -> bool {
        match self {
            Sink::MaterializeInto { created, .. } => created.contains(key),
            _ => false,
        }
    }

    /// Flush buffered output
    pub fn finish(self) -> DbResult<()> {
        if let Sink::AppendCsv { path, mut writer } = self {
            writer.flush()?;
            tracing::debug!("Flushed CSV output to {}", path.display());
        }
        Ok(())
    }
}

fn open_append(path: &Path) -> DbResult<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_record("user:1", &[("name", "Alice"), ("age", "30")]);
        store
    }

    #[test]
    fn test_project_in_declared_order() {
        let store = seeded();
        let projection = vec![
            FieldSelector::Field("age".to_string()),
            FieldSelector::RowId,
            FieldSelector::Field("email".to_string()),
        ];
        let row = project(&store, "user:1", &projection).unwrap();
        assert_eq!(
            row,
            vec![
                ProjectedField::Named {
                    name: "age".to_string(),
                    value: Some("30".to_string())
                },
                ProjectedField::Named {
                    name: "rowid()".to_string(),
                    value: Some("user:1".to_string())
                },
                ProjectedField::Named {
                    name: "email".to_string(),
                    value: None
                },
            ]
        );
    }

    #[test]
    fn test_display_wildcard_drops_names() {
        let store = seeded();
        let row = project(&store, "user:1", &[FieldSelector::Wildcard]).unwrap();
        let reply = Sink::Display.emit(&store, row).unwrap().unwrap();
        assert_eq!(
            reply,
            Reply::Array(vec![Reply::bulk("Alice"), Reply::bulk("30")])
        );
    }

    #[test]
    fn test_display_missing_field_is_null() {
        let store = seeded();
        let row = project(&store, "user:1", &[FieldSelector::Field("email".to_string())]).unwrap();
        let reply = Sink::Display.emit(&store, row).unwrap().unwrap();
        assert_eq!(reply, Reply::Array(vec![Reply::bulk("email"), Reply::Null]));
    }

    #[test]
    fn test_materialize_creates_record() {
        let store = seeded();
        let row = project(
            &store,
            "user:1",
            &[FieldSelector::Wildcard, FieldSelector::Field("email".to_string())],
        )
        .unwrap();
        let mut sink = Sink::open(&SinkTarget::MaterializeInto("copy".to_string())).unwrap();
        let reply = sink.emit(&store, row).unwrap().unwrap();

        let key = reply.as_str().unwrap().to_string();
        assert!(key.starts_with("copy:"));
        assert!(sink.is_own_output(&key));
        assert!(!sink.is_own_output("user:1"));
        assert_eq!(
            store.get_all(&key).unwrap(),
            vec![
                ("name".to_string(), "Alice".to_string()),
                ("age".to_string(), "30".to_string())
            ]
        );
    }

    #[test]
    fn test_materialize_skips_row_without_fields() {
        let store = seeded();
        let row = project(&store, "user:1", &[FieldSelector::Field("email".to_string())]).unwrap();
        let mut sink = Sink::open(&SinkTarget::MaterializeInto("copy".to_string())).unwrap();

        assert_eq!(sink.emit(&store, row).unwrap(), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_csv_line_quotes_when_needed() {
        let row = vec![
            ProjectedField::Expanded {
                field: "name".to_string(),
                value: "Smith, John".to_string(),
            },
            ProjectedField::Named {
                name: "age".to_string(),
                value: None,
            },
            ProjectedField::Named {
                name: "city".to_string(),
                value: Some("Paris".to_string()),
            },
        ];
        assert_eq!(csv_line(&row).unwrap(), "\"Smith, John\",,Paris");
    }

    #[test]
    fn test_append_csv_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "existing\n").unwrap();

        let store = seeded();
        let row = project(&store, "user:1", &[FieldSelector::Wildcard]).unwrap();
        let mut sink = Sink::open(&SinkTarget::AppendCsv(path.clone())).unwrap();
        let reply = sink.emit(&store, row).unwrap().unwrap();
        sink.finish().unwrap();

        assert_eq!(reply, Reply::bulk("Alice,30"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing\nAlice,30\n");
    }
}
