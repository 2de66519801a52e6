//! Database capability layer for db-guard.
//!
//! The guarded executor never talks to a driver directly. It goes through the
//! [`Connection`] and [`PreparedStatement`] traits, which the caller supplies:
//! the bundled [`SqliteConnection`] adapter, the [`MockConnection`] test stub,
//! or any other implementation.

mod mock;
mod sqlite;
mod types;

pub use mock::MockConnection;
pub use sqlite::{SqliteConnection, SqliteStatement};
pub use types::{Record, Value};

use crate::error::Result;

/// An open connection to a relational store.
///
/// The connection is owned by the caller; executors only borrow it for the
/// duration of a single call. All methods block until the driver returns.
pub trait Connection {
    /// Prepares a fully formed statement for parameterless execution.
    fn prepare<'c>(&'c self, sql: &str) -> Result<Box<dyn PreparedStatement + 'c>>;

    /// Returns the identifier generated by the most recent insert.
    fn last_insert_id(&self) -> Result<Value>;
}

/// A statement handle returned by [`Connection::prepare`].
pub trait PreparedStatement {
    /// Executes the statement. Driver failures come back as `Err`.
    fn execute(&mut self) -> Result<()>;

    /// Number of rows affected or returned by the last execution.
    fn row_count(&self) -> u64;

    /// Returns every record produced by the last execution.
    fn fetch_all(&mut self) -> Result<Vec<Record>>;
}
