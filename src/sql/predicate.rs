//! WHERE clause compilation and evaluation.
//!
//! A WHERE clause is a conjunction of `<field><op><literal>` comparisons.
//! All comparisons are byte-wise string comparisons; LIKE (`~`) is a
//! case-insensitive substring test.

use std::fmt;

use crate::error::DbResult;
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Ge,
    Le,
    /// `!=`
    NotEq,
    /// `<>`, same meaning as `!=`
    LtGt,
    Gt,
    Lt,
    Eq,
    /// `~`
    Like,
}

/// Operator spellings in match priority order: two-character spellings
/// come before the one-character spellings they start with.
const SPELLINGS: [(&str, Operator); 8] = [
    (">=", Operator::Ge),
    ("<=", Operator::Le),
    ("!=", Operator::NotEq),
    ("<>", Operator::LtGt),
    (">", Operator::Gt),
    ("<", Operator::Lt),
    ("=", Operator::Eq),
    ("~", Operator::Like),
];

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::NotEq => "!=",
            Operator::LtGt => "<>",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Eq => "=",
            Operator::Like => "~",
        }
    }

    /// Compare a stored field value against a literal
    pub fn compare(&self, value: &str, literal: &str) -> bool {
        match self {
            Operator::Ge => value >= literal,
            Operator::Le => value <= literal,
            Operator::NotEq | Operator::LtGt => value != literal,
            Operator::Gt => value > literal,
            Operator::Lt => value < literal,
            Operator::Eq => value == literal,
            Operator::Like => value.to_lowercase().contains(&literal.to_lowercase()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub field: String,
    pub operator: Operator,
    pub literal: String,
}

impl Clause {
    /// Split clause text at the first operator spelling found.
    ///
    /// The scan starts at the second character so the field name is never
    /// empty. Field and literal are both trimmed. Returns `None` when no
    /// operator appears.
    pub fn parse(text: &str) -> Option<Self> {
        for (pos, _) in text.char_indices().skip(1) {
            let rest = &text[pos..];
            if let Some((symbol, operator)) = SPELLINGS.iter().find(|(s, _)| rest.starts_with(s)) {
                return Some(Clause {
                    field: text[..pos].trim().to_string(),
                    operator: *operator,
                    literal: rest[symbol.len()..].trim().to_string(),
                });
            }
        }
        None
    }

    /// Evaluate against one record. An empty literal never matches and is
    /// rejected before the store is read.
    pub fn matches<S: KeyValueStore + ?Sized>(&self, store: &S, key: &str) -> DbResult<bool> {
        if self.literal.is_empty() {
            return Ok(false);
        }
        Ok(match store.get_field(key, &self.field)? {
            Some(value) => self.operator.compare(&value, &self.literal),
            None => false,
        })
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.operator, self.literal)
    }
}

/// A compiled WHERE predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Clauses evaluated left to right, stopping at the first failure
    Conjunction(Vec<Clause>),
    /// A clause had no operator; nothing can match. Holds the bad text.
    Unsatisfiable(String),
}

impl Predicate {
    /// Compile already-separated clause texts
    pub fn compile<T: AsRef<str>>(clauses: &[T]) -> Self {
        let mut compiled = Vec::with_capacity(clauses.len());
        for text in clauses {
            match Clause::parse(text.as_ref()) {
                Some(clause) => compiled.push(clause),
                None => {
                    tracing::warn!("WHERE clause without operator: {:?}", text.as_ref());
                    return Predicate::Unsatisfiable(text.as_ref().to_string());
                }
            }
        }
        Predicate::Conjunction(compiled)
    }

    /// Compile WHERE text, splitting it on the ` and ` separator
    pub fn parse(where_text: &str) -> Self {
        let clauses: Vec<&str> = where_text.split(" and ").collect();
        Self::compile(&clauses)
    }

    pub fn clauses(&self) -> &[Clause] {
        match self {
            Predicate::Conjunction(clauses) => clauses,
            Predicate::Unsatisfiable(_) => &[],
        }
    }

    /// Evaluate against one record, short-circuiting on the first failing clause
    pub fn evaluate<S: KeyValueStore + ?Sized>(&self, store: &S, key: &str) -> DbResult<bool> {
        match self {
            Predicate::Unsatisfiable(_) => Ok(false),
            Predicate::Conjunction(clauses) => {
                for clause in clauses {
                    if !clause.matches(store, key)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Unsatisfiable(text) => write!(f, "<unsatisfiable: {}>", text),
            Predicate::Conjunction(clauses) => {
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" and ")?;
                    }
                    write!(f, "{}", clause)?;
                }
                Ok(())
            }
        }
    }
}
