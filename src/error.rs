//! Error types for db-guard.
//!
//! Defines the error enum returned by connection capabilities, configuration
//! loading, and the SQLite adapter.

use thiserror::Error;

/// Main error type for db-guard operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// Opening the database failed (bad path, locked file, unreachable server).
    #[error("Connection error: {0}")]
    Connection(String),

    /// The driver rejected or failed a statement (syntax errors, constraint violations, etc.)
    #[error("Driver error: {0}")]
    Driver(String),

    /// Configuration errors (invalid config file, missing database URL, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (runtime construction, unexpected states).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GuardError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a driver error with the given message.
    pub fn driver(msg: impl Into<String>) -> Self {
        Self::Driver(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Driver(_) => "Driver Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the message without the category prefix.
    ///
    /// Execution results carry driver text verbatim, so this is what ends up
    /// in an envelope's error message.
    pub fn message(&self) -> &str {
        match self {
            Self::Connection(msg) | Self::Driver(msg) | Self::Config(msg) | Self::Internal(msg) => {
                msg
            }
        }
    }
}

/// Result type alias using GuardError.
pub type Result<T> = std::result::Result<T, GuardError>;
