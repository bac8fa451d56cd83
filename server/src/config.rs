//! Configuration for the Ludothèque server
//!
//! Command-line flags fall back to environment variables. The database file
//! defaults to `consolegame.db` inside the data directory, resolved as:
//! 1. LUDOTHEQUE_DATA_DIR environment variable
//! 2. ~/.config/ludotheque/data (production default)
//! 3. ./data (fallback for development)

use clap::Parser;
use docstore::ConnectOptions;
use std::path::PathBuf;
use std::time::Duration;

use crate::persistence::DatabaseLocation;

const DEFAULT_CONFIG_DIR: &str = ".config/ludotheque/data";
const DEV_DATA_DIR: &str = "./data";
const DATABASE_FILE: &str = "consolegame.db";
const IN_MEMORY: &str = ":memory:";

/// Book catalogue (HTML) and video game sales API (JSON).
#[derive(Debug, Clone, Parser)]
#[command(name = "ludotheque-server", version)]
pub struct Config {
    /// Address to bind.
    #[arg(long, env = "LUDOTHEQUE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// SQLite file holding the document database, or `:memory:` for a
    /// throwaway in-memory one.
    #[arg(long, env = "LUDOTHEQUE_DATABASE")]
    pub database: Option<PathBuf>,

    /// How long to wait for a database connection, in milliseconds.
    #[arg(long, env = "LUDOTHEQUE_SERVER_SELECTION_TIMEOUT_MS", default_value_t = 5000)]
    pub server_selection_timeout_ms: u64,

    /// Also write logs to a daily-rotated file in this directory.
    #[arg(long, env = "LUDOTHEQUE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn database_location(&self) -> DatabaseLocation {
        match &self.database {
            Some(path) if path.as_os_str() == IN_MEMORY => DatabaseLocation::Memory,
            Some(path) => DatabaseLocation::File(path.clone()),
            None => DatabaseLocation::File(get_data_dir().join(DATABASE_FILE)),
        }
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            acquire_timeout: Duration::from_millis(self.server_selection_timeout_ms),
            ..ConnectOptions::default()
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Get the data directory for persistence.
///
/// Priority:
/// 1. LUDOTHEQUE_DATA_DIR env variable if set
/// 2. $HOME/.config/ludotheque/data if HOME is set
/// 3. ./data as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LUDOTHEQUE_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}
