//! SQLite connection adapter.
//!
//! Provides [`SqliteConnection`], a blocking [`Connection`] implementation
//! backed by sqlx. The adapter owns a current-thread tokio runtime and drives
//! every driver call to completion with `block_on`, so it must not be used
//! from inside an async runtime.

use super::{Connection, PreparedStatement, Record, Value};
use crate::config::DatabaseConfig;
use crate::error::{GuardError, Result};
use futures::TryStreamExt;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Either, Executor, Row, Sqlite, TypeInfo, ValueRef};
use std::cell::Cell;
use std::str::FromStr;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Maximum time to wait for the single pooled connection.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// A blocking connection to a SQLite database.
///
/// The pool holds exactly one connection that is never recycled, so
/// `last_insert_id` and in-memory databases stay tied to one session.
pub struct SqliteConnection {
    runtime: Runtime,
    pool: SqlitePool,
    last_insert_id: Cell<i64>,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("last_insert_id", &self.last_insert_id.get())
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Opens the database described by `config`.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let url = config.connection_url()?;

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| GuardError::config(format!("Invalid database URL: {e}")))?
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
            .create_if_missing(config.create_if_missing);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| GuardError::internal(format!("Failed to create runtime: {e}")))?;

        let pool = runtime
            .block_on(
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
                    .connect_with(options),
            )
            .map_err(|e| GuardError::connection(format!("Failed to open database: {e}")))?;

        info!("Opened SQLite database at {}", config.display_string());

        Ok(Self {
            runtime,
            pool,
            last_insert_id: Cell::new(0),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&DatabaseConfig::with_url("sqlite::memory:"))
    }

    fn run(&self, sql: &str) -> Result<Execution> {
        let execution = self.runtime.block_on(run_statement(&self.pool, sql))?;
        self.last_insert_id.set(execution.last_insert_id);
        Ok(execution)
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        self.runtime.block_on(self.pool.close());
    }
}

impl Connection for SqliteConnection {
    /// Captures the statement text. SQLite compiles it on `execute`, so
    /// syntax errors surface there.
    fn prepare<'c>(&'c self, sql: &str) -> Result<Box<dyn PreparedStatement + 'c>> {
        Ok(Box::new(SqliteStatement {
            conn: self,
            sql: sql.to_string(),
            records: Vec::new(),
            row_count: 0,
        }))
    }

    fn last_insert_id(&self) -> Result<Value> {
        Ok(Value::Int(self.last_insert_id.get()))
    }
}

/// A statement prepared on a [`SqliteConnection`].
pub struct SqliteStatement<'c> {
    conn: &'c SqliteConnection,
    sql: String,
    records: Vec<Record>,
    row_count: u64,
}

impl PreparedStatement for SqliteStatement<'_> {
    fn execute(&mut self) -> Result<()> {
        let execution = self.conn.run(&self.sql)?;

        // Statements that yield rows (SELECT, RETURNING) count those rows;
        // everything else counts the rows it changed.
        self.row_count = if execution.records.is_empty() {
            execution.changes
        } else {
            execution.records.len() as u64
        };
        self.records = execution.records;

        debug!("Statement finished with row count {}", self.row_count);
        Ok(())
    }

    fn row_count(&self) -> u64 {
        self.row_count
    }

    fn fetch_all(&mut self) -> Result<Vec<Record>> {
        Ok(std::mem::take(&mut self.records))
    }
}

/// Everything one execution produced.
struct Execution {
    records: Vec<Record>,
    changes: u64,
    last_insert_id: i64,
}

/// Runs `sql` on the pooled connection.
///
/// The change count is the sum of `rows_affected` reported for the statement,
/// which excludes rows written by triggers and foreign key actions. SQLite
/// leaves that count stale after a statement that writes nothing (a SELECT,
/// DDL), so it only applies when `total_changes()` moved at all.
async fn run_statement(pool: &SqlitePool, sql: &str) -> Result<Execution> {
    let mut conn = pool
        .acquire()
        .await
        .map_err(|e| GuardError::connection(e.to_string()))?;

    let before = total_changes(&mut conn).await?;

    let mut records = Vec::new();
    let mut rows_affected = 0u64;
    let mut last_insert_id = None;
    {
        let mut stream = (&mut *conn).fetch_many(sqlx::query(sql).persistent(false));
        while let Some(step) = stream.try_next().await.map_err(map_driver_error)? {
            match step {
                Either::Left(done) => {
                    rows_affected += done.rows_affected();
                    last_insert_id = Some(done.last_insert_rowid());
                }
                Either::Right(row) => records.push(convert_row(&row)),
            }
        }
    }

    let wrote = total_changes(&mut conn).await? != before;

    let last_insert_id = match last_insert_id {
        Some(id) => id,
        None => sqlx::query_scalar("SELECT last_insert_rowid()")
            .fetch_one(&mut *conn)
            .await
            .map_err(map_driver_error)?,
    };

    Ok(Execution {
        records,
        changes: if wrote { rows_affected } else { 0 },
        last_insert_id,
    })
}

async fn total_changes(conn: &mut PoolConnection<Sqlite>) -> Result<i64> {
    sqlx::query_scalar("SELECT total_changes()")
        .fetch_one(&mut **conn)
        .await
        .map_err(map_driver_error)
}

/// Converts a sqlx SqliteRow to a Record.
fn convert_row(row: &SqliteRow) -> Record {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| (col.name().to_string(), convert_value(row, i)))
        .collect()
}

/// Converts a single column value using its runtime storage class.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match type_name.as_str() {
        "INTEGER" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Keeps the database's own message when there is one.
fn map_driver_error(error: sqlx::Error) -> GuardError {
    match error.as_database_error() {
        Some(db_error) => GuardError::driver(db_error.message()),
        None => GuardError::driver(error.to_string()),
    }
}
