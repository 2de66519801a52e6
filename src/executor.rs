//! Guarded statement execution.
//!
//! Every operation follows the same linear flow: check the statement against
//! the guard for its intent, execute it on the caller's connection, and fold
//! whatever happened into one [`ExecutionResult`]. Nothing is raised to the
//! caller; driver failures are caught here and reported in the envelope.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::db::{Connection, Record, Value};
use crate::error::{GuardError, Result};
use crate::guard::{self, StatementIntent};

/// How a guarded call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// At least one row was affected or returned.
    Succeeded,
    /// The statement failed its guard and was never executed.
    Rejected,
    /// The statement ran but matched no rows.
    NoMatch,
    /// The driver reported an error while preparing or executing.
    DriverFailure,
}

/// Operation-specific result body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// Nothing to report (update, delete, and every failure).
    #[default]
    Empty,
    /// The full result set of a read.
    Records(Vec<Record>),
    /// The identifier generated by an insert, with the statement that produced it.
    Inserted { id: Value, sql: String },
}

impl Payload {
    /// Returns true for [`Payload::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the records of a read.
    pub fn records(&self) -> Option<&[Record]> {
        match self {
            Self::Records(records) => Some(records),
            _ => None,
        }
    }

    /// Returns the generated identifier of an insert.
    pub fn inserted_id(&self) -> Option<&Value> {
        match self {
            Self::Inserted { id, .. } => Some(id),
            _ => None,
        }
    }
}

impl Serialize for Payload {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Empty => serializer.serialize_map(Some(0))?.end(),
            Self::Records(records) => records.serialize(serializer),
            Self::Inserted { id, sql } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("id", id)?;
                map.serialize_entry("sql", sql)?;
                map.end()
            }
        }
    }
}

/// The envelope every guarded operation returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    /// True iff the guard passed, the driver raised nothing, and rows were touched.
    pub succeeded: bool,

    /// Empty on success; otherwise the rejection reason or driver text.
    pub error_message: String,

    /// Rows affected or returned. Unset when execution never completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,

    pub payload: Payload,

    pub outcome: Outcome,
}

impl ExecutionResult {
    fn success(rows: u64, payload: Payload) -> Self {
        Self {
            succeeded: true,
            error_message: String::new(),
            affected_rows: Some(rows),
            payload,
            outcome: Outcome::Succeeded,
        }
    }

    fn rejected(message: String) -> Self {
        Self {
            succeeded: false,
            error_message: message,
            affected_rows: None,
            payload: Payload::Empty,
            outcome: Outcome::Rejected,
        }
    }

    fn no_match(sql: &str) -> Self {
        Self {
            succeeded: false,
            error_message: format!("No records matched the statement: {sql}"),
            affected_rows: Some(0),
            payload: Payload::Empty,
            outcome: Outcome::NoMatch,
        }
    }

    fn driver_failure(error: &GuardError) -> Self {
        let message = if error.message().is_empty() {
            error.to_string()
        } else {
            error.message().to_string()
        };

        Self {
            succeeded: false,
            error_message: message,
            affected_rows: None,
            payload: Payload::Empty,
            outcome: Outcome::DriverFailure,
        }
    }
}

/// Runs guarded statements on a borrowed connection.
pub struct GuardedExecutor<'a, C: Connection + ?Sized> {
    conn: &'a C,
}

impl<'a, C: Connection + ?Sized> GuardedExecutor<'a, C> {
    /// Creates an executor over the caller's connection.
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Runs a statement that must contain `select`; the payload holds the rows.
    pub fn read(&self, sql: &str) -> ExecutionResult {
        self.run(StatementIntent::Read, sql)
    }

    /// Runs a statement that must contain `update` and `where`.
    pub fn update(&self, sql: &str) -> ExecutionResult {
        self.run(StatementIntent::Update, sql)
    }

    /// Runs a statement that must contain `delete` and `where`.
    pub fn delete(&self, sql: &str) -> ExecutionResult {
        self.run(StatementIntent::Delete, sql)
    }

    /// Runs a statement that must contain `insert`; the payload holds the new id.
    pub fn insert(&self, sql: &str) -> ExecutionResult {
        self.run(StatementIntent::Insert, sql)
    }

    /// Guard, execute, classify.
    pub fn run(&self, intent: StatementIntent, sql: &str) -> ExecutionResult {
        if let Err(rejection) = guard::check(intent, sql) {
            debug!("Rejected {} statement: {}", intent, rejection.message);
            return ExecutionResult::rejected(rejection.message);
        }

        match self.execute(intent, sql) {
            Ok(result) => result,
            Err(e) => {
                warn!("{} during {}: {}", e.category(), intent, e.message());
                ExecutionResult::driver_failure(&e)
            }
        }
    }

    fn execute(&self, intent: StatementIntent, sql: &str) -> Result<ExecutionResult> {
        let mut stmt = self.conn.prepare(sql)?;
        stmt.execute()?;

        let rows = stmt.row_count();
        if rows == 0 {
            debug!("No rows matched {} statement", intent);
            return Ok(ExecutionResult::no_match(sql));
        }

        let payload = match intent {
            StatementIntent::Read => Payload::Records(stmt.fetch_all()?),
            StatementIntent::Insert => Payload::Inserted {
                id: self.conn.last_insert_id()?,
                sql: sql.to_string(),
            },
            StatementIntent::Update | StatementIntent::Delete => Payload::Empty,
        };

        debug!("{} statement touched {} rows", intent, rows);
        Ok(ExecutionResult::success(rows, payload))
    }
}

/// Runs a guarded read on `conn`.
pub fn read<C: Connection + ?Sized>(sql: &str, conn: &C) -> ExecutionResult {
    GuardedExecutor::new(conn).read(sql)
}

/// Runs a guarded update on `conn`.
pub fn update<C: Connection + ?Sized>(sql: &str, conn: &C) -> ExecutionResult {
    GuardedExecutor::new(conn).update(sql)
}

/// Runs a guarded delete on `conn`.
pub fn delete<C: Connection + ?Sized>(sql: &str, conn: &C) -> ExecutionResult {
    GuardedExecutor::new(conn).delete(sql)
}

/// Runs a guarded insert on `conn`.
pub fn insert<C: Connection + ?Sized>(sql: &str, conn: &C) -> ExecutionResult {
    GuardedExecutor::new(conn).insert(sql)
}
