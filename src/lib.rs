//! db-guard - guarded execution of raw SQL statements.
//!
//! Callers hand over a fully formed statement and their own open connection;
//! the executor checks the statement's shape against the declared intent,
//! runs it, and reports every outcome through one [`ExecutionResult`].

pub mod config;
pub mod db;
pub mod error;
pub mod executor;
pub mod guard;
pub mod logging;

pub use db::{Connection, PreparedStatement, Record, Value};
pub use error::{GuardError, Result};
pub use executor::{
    delete, insert, read, update, ExecutionResult, GuardedExecutor, Outcome, Payload,
};
pub use guard::StatementIntent;
