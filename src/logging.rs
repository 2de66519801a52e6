//! Logging configuration for db-guard.
//!
//! Embedding applications usually install their own subscriber; these helpers
//! cover the cases where they don't. Initialization is idempotent: if a global
//! subscriber is already set, the call is a no-op.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{GuardError, Result};

/// Initializes logging according to the given configuration.
///
/// Writes to the configured file when one is set, otherwise to stderr.
pub fn init(config: &LoggingConfig) -> Result<()> {
    match &config.file {
        Some(path) => init_file_logging(path, &config.level),
        None => {
            init_stderr_logging(&config.level);
            Ok(())
        }
    }
}

/// Initializes logging to stderr.
///
/// `RUST_LOG` takes precedence over `default_level`.
pub fn init_stderr_logging(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .try_init();
}

/// Initializes logging to a file, truncating it on each run.
pub fn init_file_logging(path: &Path, default_level: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| GuardError::config(format!("Could not create log directory: {e}")))?;
    }

    let log_file = File::create(path)
        .map_err(|e| GuardError::config(format!("Could not create log file: {e}")))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(log_file)
        .with_ansi(false) // No ANSI colors in file output
        .try_init();

    Ok(())
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Returns the default path for a log file.
///
/// Uses the XDG state directory on Linux (`~/.local/state/db-guard/db-guard.log`),
/// or falls back to the config directory on other platforms.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("db-guard").join("db-guard.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("db-guard").join("db-guard.log");
    }

    std::env::temp_dir().join("db-guard.log")
}
