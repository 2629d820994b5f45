pub mod config;
pub mod error;
pub mod executor;
pub mod sql;
pub mod storage;

pub use config::{Config, Limits};
pub use error::{DbError, DbResult};
pub use executor::{QueryExecutor, Reply};
pub use sql::{parse, parse_command, Statement, StatementKind};
pub use storage::{KeyValueStore, MemoryStore};

/// Parse and run one command. `argv[0]` is `select`, `insert` or `delete`.
pub fn execute_command<S, A>(store: &S, argv: &[A], limits: &Limits) -> DbResult<Reply>
where
    S: KeyValueStore + ?Sized,
    A: AsRef<str>,
{
    let statement = parse_command(argv, limits)?;
    QueryExecutor::new(store).execute(&statement)
}
