//! Runtime configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | `postgres://localhost/mediatrack` |
//! | `DATABASE_MAX_CONNECTIONS` | `10` |
//! | `MEDIATRACK_USER` | none |
//! | `LOG_FORMAT` | `text` (`json` also accepted) |
//! | `LOG_FILE` | none, logs go to stderr |
//! | `LOG_ANSI` | auto-detected |
//!
//! A `.env` file in the working directory is loaded first by `main`.

use anyhow::{bail, Context, Result};

use mediatrack_core::defaults;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub file: Option<String>,
    pub ansi: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Username acting when `--user` is not given.
    pub default_user: Option<String>,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| defaults::DATABASE_URL.to_string());

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS must be a number, got '{}'", raw))?,
            None => defaults::DB_MAX_CONNECTIONS,
        };
        if max_connections == 0 {
            bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }

        let format = match lookup("LOG_FORMAT")
            .unwrap_or_else(|| defaults::LOG_FORMAT.to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            "text" => LogFormat::Text,
            other => bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
        };

        Ok(Self {
            database_url,
            max_connections,
            default_user: lookup("MEDIATRACK_USER").filter(|u| !u.trim().is_empty()),
            log: LogConfig {
                format,
                file: lookup("LOG_FILE").filter(|f| !f.is_empty()),
                ansi: lookup("LOG_ANSI").map(|v| v == "true" || v == "1"),
            },
        })
    }
}
