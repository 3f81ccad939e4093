//! Application configuration management

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Where user records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Persistent storage in a SQLite database (default)
    Sqlite,
    /// Process-local storage, lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!(
                "unknown storage backend '{}' (expected sqlite or memory)",
                other
            ),
        }
    }
}

/// Console log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => anyhow::bail!("unknown log format '{}' (expected json or pretty)", other),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// SQLite connection URL. DATABASE_URL wins over DATABASE_PATH; a bare
    /// path is turned into a `sqlite:` URL.
    pub database_url: String,

    pub database_max_connections: u32,

    /// How long to keep retrying the initial database connection
    pub database_connect_timeout: Duration,

    pub storage_backend: StorageBackend,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = match (var("DATABASE_URL"), var("DATABASE_PATH")) {
            (Some(url), _) => url,
            (None, Some(path)) if path.starts_with("sqlite:") => path,
            (None, Some(path)) => format!("sqlite:{}", path),
            (None, None) => "sqlite:./data/users.db".to_string(),
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),

            port: var("PORT")
                .unwrap_or_else(|| "3001".to_string())
                .parse()
                .context("Invalid PORT")?,

            database_url,

            database_max_connections: var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?,

            database_connect_timeout: Duration::from_secs(
                var("DATABASE_CONNECT_TIMEOUT_SECS")
                    .unwrap_or_else(|| "30".to_string())
                    .parse()
                    .context("Invalid DATABASE_CONNECT_TIMEOUT_SECS")?,
            ),

            storage_backend: var("STORAGE_BACKEND")
                .as_deref()
                .unwrap_or("sqlite")
                .parse()
                .context("Invalid STORAGE_BACKEND")?,

            log_format: var("LOG_FORMAT")
                .as_deref()
                .unwrap_or("json")
                .parse()
                .context("Invalid LOG_FORMAT")?,
        })
    }
}
