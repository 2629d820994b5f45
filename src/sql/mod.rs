//! Statement parsing for the dbx query dialect.
//!
//! Raw argument words are rebuilt into one statement string, tokenized, and
//! run through a per-statement-kind state machine that yields a
//! [`Statement`]. WHERE text is compiled into a [`Predicate`] and the FROM
//! pattern into a [`Pattern`].

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod pattern;
pub mod predicate;

pub use ast::{
    DeleteStatement, Direction, FieldSelector, InsertSource, InsertStatement, OrderSpec,
    SelectStatement, SinkTarget, Statement, StatementKind,
};
pub use parser::Parser;
pub use pattern::Pattern;
pub use predicate::{Clause, Operator, Predicate};

use crate::config::Limits;
use crate::error::{DbError, DbResult};

/// Parse a command: `argv[0]` is the statement keyword, the rest its words.
///
/// Exactly two arguments means the statement body arrived as one quoted
/// string; more means it arrived word by word.
pub fn parse_command<S: AsRef<str>>(argv: &[S], limits: &Limits) -> DbResult<Statement> {
    if argv.len() < 2 {
        return Err(DbError::Arity);
    }

    let command = argv[0].as_ref();
    let kind = StatementKind::from_command(command)
        .ok_or_else(|| DbError::ParseError(format!("unknown statement '{}'", command)))?;

    let words: Vec<&str> = argv[1..].iter().map(AsRef::as_ref).collect();
    let statement = lexer::reconstruct(&words, limits)?;
    Parser::new(&statement, *limits)?.parse(kind)
}

/// Parse a whole statement line such as `select * from ^user:`
pub fn parse(line: &str, limits: &Limits) -> DbResult<Statement> {
    let line = line.trim();
    let (command, body) = line.split_once(' ').unwrap_or((line, ""));
    if body.trim().is_empty() {
        return parse_command(&[command], limits);
    }
    parse_command(&[command, body], limits)
}
