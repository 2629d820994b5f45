//! dbx command line
//!
//! Runs select / insert / delete statements against an in-memory store,
//! optionally persisted to a JSON snapshot between runs.
//!
//! Usage: dbx [OPTIONS]
//!
//! Options:
//!   -c, --command <STMT>    Run a statement and exit (repeatable)
//!       --data <FILE>       JSON snapshot to load and save
//!       --config <DIR>      Directory holding dbx.toml and .env
//!       --json              Print replies as JSON

use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dbx::sql::{SinkTarget, Statement};
use dbx::{Config, DbResult, MemoryStore, QueryExecutor, Reply};

#[derive(Parser, Debug)]
#[command(name = "dbx")]
#[command(about = "dbx - SQL-like statements over a key/field store", long_about = None)]
struct Args {
    /// Statement to run, e.g. "select * from ^user:"
    #[arg(short, long = "command")]
    commands: Vec<String>,

    /// JSON snapshot file (overrides the config file)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Directory containing dbx.toml
    #[arg(long, default_value = ".")]
    config: PathBuf,

    /// Print replies as JSON
    #[arg(long)]
    json: bool,
}

struct Session {
    store: MemoryStore,
    config: Config,
    data_file: Option<PathBuf>,
    json: bool,
}

impl Session {
    fn run(&self, line: &str) -> DbResult<Reply> {
        let statement = dbx::parse(line, &self.config.limits)?;
        let reply = QueryExecutor::new(&self.store).execute(&statement)?;

        if is_mutation(&statement) {
            if let Some(path) = &self.data_file {
                self.store.save(path)?;
            }
        }
        Ok(reply)
    }

    fn print(&self, result: DbResult<Reply>) {
        match result {
            Ok(reply) if self.json => match serde_json::to_string(&reply) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("{} {}", "(error)".red(), e),
            },
            Ok(reply) => println!("{}", reply),
            Err(e) => eprintln!("{} {}: {}", "(error)".red(), e.kind().yellow(), e),
        }
    }
}

fn is_mutation(statement: &Statement) -> bool {
    match statement {
        Statement::Insert(_) | Statement::Delete(_) => true,
        Statement::Select(select) => matches!(select.sink, SinkTarget::MaterializeInto(_)),
    }
}

fn repl(session: &Session) -> anyhow::Result<()> {
    let mut editor = rustyline::DefaultEditor::new()?;
    println!(
        "{} (statements: select, insert, delete; {} to leave)",
        "dbx".bold().cyan(),
        "exit".bold()
    );

    loop {
        match editor.readline(&format!("{} ", "dbx>".green())) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    break;
                }
                let _ = editor.add_history_entry(line);
                session.print(session.run(line));
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dbx=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(&args.config)?;
    let data_file = args.data.clone().or_else(|| config.store.data_file.clone());

    let store = match &data_file {
        Some(path) => MemoryStore::load(path, config.store.scan_page_size)?,
        None => MemoryStore::with_page_size(config.store.scan_page_size),
    };
    tracing::debug!("Store ready with {} records", store.len());

    let session = Session {
        store,
        config,
        data_file,
        json: args.json,
    };

    if args.commands.is_empty() {
        return repl(&session);
    }

    let mut failed = false;
    for command in &args.commands {
        let result = session.run(command);
        failed |= result.is_err();
        session.print(result);
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
