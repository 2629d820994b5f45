//! Configuration handling for the dbx binary and library.
//!
//! Reads the optional `dbx.toml` configuration file.
//!
//! ## Environment Variables
//!
//! The following environment variables override config file settings:
//!
//! - `DBX_SCAN_PAGE_SIZE` - Number of keys returned per scan page
//! - `DBX_DATA_FILE` - JSON snapshot the in-memory store is loaded from
//! - `DBX_MAX_STATEMENT_LEN` - Maximum length of a reconstructed statement
//! - `DBX_MAX_CLAUSE_LEN` - Maximum length of each clause buffer
//!
//! These can be set in a `.env` file next to the config file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "dbx.toml";

/// Environment variable names
pub const ENV_SCAN_PAGE_SIZE: &str = "DBX_SCAN_PAGE_SIZE";
pub const ENV_DATA_FILE: &str = "DBX_DATA_FILE";
pub const ENV_MAX_STATEMENT_LEN: &str = "DBX_MAX_STATEMENT_LEN";
pub const ENV_MAX_CLAUSE_LEN: &str = "DBX_MAX_CLAUSE_LEN";

/// Declared maximum for the whole reconstructed statement
pub const MAX_STATEMENT_LEN: usize = 1024;

/// Declared maximum for each select/where/order/field/value buffer
pub const MAX_CLAUSE_LEN: usize = 512;

/// Capacity limits enforced by the tokenizer and parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_statement")]
    pub statement: usize,
    #[serde(default = "default_clause")]
    pub clause: usize,
}

fn default_statement() -> usize {
    MAX_STATEMENT_LEN
}

fn default_clause() -> usize {
    MAX_CLAUSE_LEN
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            statement: MAX_STATEMENT_LEN,
            clause: MAX_CLAUSE_LEN,
        }
    }
}

/// Store-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Keys returned per scan page (Redis SCAN uses 10)
    #[serde(default = "default_page_size")]
    pub scan_page_size: usize,
    /// Optional JSON snapshot path (relative to the config file)
    #[serde(default)]
    pub data_file: Option<PathBuf>,
}

fn default_page_size() -> usize {
    10
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            scan_page_size: default_page_size(),
            data_file: None,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from a directory
    ///
    /// A `.env` file in the directory is loaded first. A missing
    /// `dbx.toml` is not an error: defaults are used instead.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let env_path = dir.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }

        let config_path = dir.join(CONFIG_FILE_NAME);
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let mut config: Config = toml::from_str(&content)?;
            if let Some(data_file) = config.store.data_file.take() {
                config.store.data_file = Some(if data_file.is_absolute() {
                    data_file
                } else {
                    dir.join(data_file)
                });
            }
            config
        } else {
            tracing::debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, dir.display());
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Some(size) = env_usize(ENV_SCAN_PAGE_SIZE) {
            if size > 0 {
                self.store.scan_page_size = size;
            }
        }

        if let Ok(path) = std::env::var(ENV_DATA_FILE) {
            if !path.is_empty() {
                self.store.data_file = Some(PathBuf::from(path));
            }
        }

        if let Some(len) = env_usize(ENV_MAX_STATEMENT_LEN) {
            self.limits.statement = len;
        }

        if let Some(len) = env_usize(ENV_MAX_CLAUSE_LEN) {
            self.limits.clause = len;
        }
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|v| v.parse::<usize>().ok())
}
