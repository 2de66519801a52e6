//! Mock connection for testing.
//!
//! Returns scripted results and records every statement it is asked to
//! prepare, so tests can assert whether execution was attempted at all.

use super::{Connection, PreparedStatement, Record, Value};
use crate::error::{GuardError, Result};
use std::cell::RefCell;

/// A scripted connection that never touches a real database.
#[derive(Debug, Default)]
pub struct MockConnection {
    row_count: u64,
    records: Vec<Record>,
    last_insert_id: Value,
    prepare_error: Option<String>,
    execute_error: Option<String>,
    prepared: RefCell<Vec<String>>,
    executed: RefCell<Vec<String>>,
}

impl MockConnection {
    /// Creates a connection whose statements affect no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements report `count` affected rows.
    pub fn with_row_count(mut self, count: u64) -> Self {
        self.row_count = count;
        self
    }

    /// Statements return these records; the row count follows their number.
    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        self.row_count = records.len() as u64;
        self.records = records;
        self
    }

    /// `last_insert_id` returns this identifier.
    pub fn with_last_insert_id(mut self, id: impl Into<Value>) -> Self {
        self.last_insert_id = id.into();
        self
    }

    /// `prepare` fails with this driver message.
    pub fn failing_on_prepare(mut self, message: impl Into<String>) -> Self {
        self.prepare_error = Some(message.into());
        self
    }

    /// `execute` fails with this driver message.
    pub fn failing_on_execute(mut self, message: impl Into<String>) -> Self {
        self.execute_error = Some(message.into());
        self
    }

    /// Every statement text passed to `prepare`, in call order.
    pub fn prepared_statements(&self) -> Vec<String> {
        self.prepared.borrow().clone()
    }

    /// Every statement text that reached `execute`, in call order.
    pub fn executed_statements(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }

    /// Returns true if `prepare` was called at least once.
    pub fn was_prepared(&self) -> bool {
        !self.prepared.borrow().is_empty()
    }
}

impl Connection for MockConnection {
    fn prepare<'c>(&'c self, sql: &str) -> Result<Box<dyn PreparedStatement + 'c>> {
        self.prepared.borrow_mut().push(sql.to_string());

        if let Some(message) = &self.prepare_error {
            return Err(GuardError::driver(message.clone()));
        }

        Ok(Box::new(MockStatement {
            conn: self,
            sql: sql.to_string(),
            executed: false,
        }))
    }

    fn last_insert_id(&self) -> Result<Value> {
        Ok(self.last_insert_id.clone())
    }
}

struct MockStatement<'c> {
    conn: &'c MockConnection,
    sql: String,
    executed: bool,
}

impl PreparedStatement for MockStatement<'_> {
    fn execute(&mut self) -> Result<()> {
        self.conn.executed.borrow_mut().push(self.sql.clone());

        if let Some(message) = &self.conn.execute_error {
            return Err(GuardError::driver(message.clone()));
        }

        self.executed = true;
        Ok(())
    }

    fn row_count(&self) -> u64 {
        if self.executed {
            self.conn.row_count
        } else {
            0
        }
    }

    fn fetch_all(&mut self) -> Result<Vec<Record>> {
        if !self.executed {
            return Err(GuardError::internal("statement has not been executed"));
        }
        Ok(self.conn.records.clone())
    }
}
