//! Configuration management for db-guard.
//!
//! Handles loading configuration from TOML files and environment variables:
//! where the SQLite database lives and how logging is set up.

use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use url::Url;

/// Environment variable consulted when no database URL is configured.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Main configuration structure for db-guard.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Connection URL, e.g. `sqlite:app.db` or `sqlite::memory:`.
    pub url: Option<String>,

    /// How long SQLite waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,

    /// Create the database file when it does not exist yet.
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,
}

fn default_busy_timeout_secs() -> u64 {
    5
}

fn default_create_if_missing() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            busy_timeout_secs: default_busy_timeout_secs(),
            create_if_missing: default_create_if_missing(),
        }
    }
}

impl DatabaseConfig {
    /// Creates a config pointing at the given URL with default settings.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Returns the validated connection URL.
    ///
    /// Only the `sqlite` scheme is accepted.
    pub fn connection_url(&self) -> Result<&str> {
        let raw = self
            .url
            .as_deref()
            .ok_or_else(|| GuardError::config("Database URL is required"))?;

        let url = Url::parse(raw)
            .map_err(|e| GuardError::config(format!("Invalid database URL: {e}")))?;

        if url.scheme() != "sqlite" {
            return Err(GuardError::config(format!(
                "Invalid scheme '{}'. Expected 'sqlite'",
                url.scheme()
            )));
        }

        Ok(raw)
    }

    /// Applies `DATABASE_URL` from the process environment (or a `.env` file) as a default.
    pub fn apply_env_defaults(&mut self) {
        let _ = dotenvy::dotenv();
        self.apply_defaults_from(|key| std::env::var(key).ok());
    }

    /// Applies defaults from an arbitrary variable lookup.
    pub fn apply_defaults_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.url.is_none() {
            self.url = lookup(DATABASE_URL_ENV);
        }
    }

    /// Returns a display-safe description of the configured database.
    pub fn display_string(&self) -> String {
        match self.url.as_deref() {
            Some(url) => url.to_string(),
            None => "<unconfigured>".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Write logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("db-guard")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file, then fills gaps from the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_from_file(path)?;
        config.database.apply_env_defaults();
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| GuardError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            GuardError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}
