use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("wrong number of arguments")]
    Arity,

    /// Holds the clause label, or an empty string for the whole statement
    #[error("{}", too_long_message(.0))]
    ArgumentTooLong(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("regex compilation failed: {0}")]
    PatternCompileError(String),

    #[error("Value count mismatch: {fields} fields but {values} values")]
    ValueCountMismatch { fields: usize, values: usize },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type DbResult<T> = Result<T, DbError>;

fn too_long_message(label: &str) -> String {
    if label.is_empty() {
        "arguments are too long".to_string()
    } else {
        format!("{} arguments are too long", label)
    }
}

impl DbError {
    /// Short machine-readable name of the error kind, used in error replies.
    pub fn kind(&self) -> &'static str {
        match self {
            DbError::Arity => "Arity",
            DbError::ArgumentTooLong(_) => "ArgumentTooLong",
            DbError::ParseError(_) => "ParseError",
            DbError::PatternCompileError(_) => "PatternCompileError",
            DbError::ValueCountMismatch { .. } => "ValueCountMismatch",
            DbError::FileNotFound(_) => "FileNotFound",
            DbError::StoreError(_) => "StoreError",
            DbError::IoError(_) => "IoError",
            DbError::CsvError(_) => "CsvError",
            DbError::JsonError(_) => "JsonError",
        }
    }
}

impl serde::Serialize for DbError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
