use std::fmt;
use std::path::PathBuf;

use super::pattern::Pattern;
use super::predicate::Predicate;

/// Statement kind, selected by the leading command keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Delete,
}

impl StatementKind {
    /// Resolve a command word. The `dbx.` namespace prefix is optional.
    pub fn from_command(word: &str) -> Option<Self> {
        match word.strip_prefix("dbx.").unwrap_or(word) {
            "select" => Some(StatementKind::Select),
            "insert" => Some(StatementKind::Insert),
            "delete" => Some(StatementKind::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Delete => "delete",
        }
    }
}

/// A parsed statement
#[derive(Debug, Clone)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Delete(DeleteStatement),
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Select(_) => StatementKind::Select,
            Statement::Insert(_) => StatementKind::Insert,
            Statement::Delete(_) => StatementKind::Delete,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub projection: Vec<FieldSelector>,
    pub source: Pattern,
    pub predicate: Option<Predicate>,
    pub order: Vec<OrderSpec>,
    pub limit: Option<usize>,
    pub sink: SinkTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub target: String,
    pub source: InsertSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    /// `(f1,f2) values (v1,v2)`, lengths already checked equal
    Values {
        fields: Vec<String>,
        values: Vec<String>,
    },
    /// Bulk load; `fields` empty means the first CSV line names them
    Csv { fields: Vec<String>, path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct DeleteStatement {
    pub source: Pattern,
    pub predicate: Option<Predicate>,
}

/// One entry of a SELECT projection list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelector {
    /// `*`: every field of the record
    Wildcard,
    /// `rowid()`: the record key
    RowId,
    Field(String),
}

impl FieldSelector {
    pub const ROWID: &'static str = "rowid()";

    pub fn parse(name: &str) -> Self {
        match name {
            "*" => FieldSelector::Wildcard,
            Self::ROWID => FieldSelector::RowId,
            other => FieldSelector::Field(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub field: String,
    pub direction: Direction,
}

impl OrderSpec {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

impl fmt::Display for OrderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Asc => write!(f, "{}", self.field),
            Direction::Desc => write!(f, "{} desc", self.field),
        }
    }
}

/// Where a SELECT sends its projected rows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SinkTarget {
    #[default]
    Display,
    /// Write each row as a new record under this key prefix
    MaterializeInto(String),
    /// Append each row as a CSV line to this file
    AppendCsv(PathBuf),
}
