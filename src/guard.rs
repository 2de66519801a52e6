//! Statement shape guard.
//!
//! Decides whether a raw statement may be executed for a declared intent.
//! This is a substring heuristic, not a SQL parser: the statement is lower
//! cased and searched for the intent's keywords. A keyword inside a string
//! literal or a comment satisfies the guard just like a real one.

use std::fmt;

/// The intent a caller declares for a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementIntent {
    /// Returns rows (`select`).
    Read,
    /// Modifies existing rows (`update ... where`).
    Update,
    /// Removes existing rows (`delete ... where`).
    Delete,
    /// Adds rows (`insert`).
    Insert,
}

impl StatementIntent {
    /// Keywords that must all appear, in lower case, somewhere in the statement.
    pub fn required_keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Read => &["select"],
            Self::Update => &["where", "update"],
            Self::Delete => &["where", "delete"],
            Self::Insert => &["insert"],
        }
    }

    /// Builds the message returned when `sql` fails this intent's guard.
    pub fn rejection_message(&self, sql: &str) -> String {
        match self {
            Self::Read => format!("The SELECT statement is malformed: {sql}"),
            Self::Update => format!("An UPDATE without a WHERE clause is not allowed: {sql}"),
            Self::Delete => format!("A DELETE without a WHERE clause is not allowed: {sql}"),
            Self::Insert => format!("The INSERT statement is malformed: {sql}"),
        }
    }
}

impl fmt::Display for StatementIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Insert => write!(f, "insert"),
        }
    }
}

/// A statement that failed its guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardRejection {
    /// The intent the statement was checked against.
    pub intent: StatementIntent,
    /// Human-readable reason, embedding the statement verbatim.
    pub message: String,
}

/// Checks `sql` against the guard for `intent`.
pub fn check(intent: StatementIntent, sql: &str) -> Result<(), GuardRejection> {
    let normalized = sql.to_lowercase();

    let satisfied = intent
        .required_keywords()
        .iter()
        .all(|keyword| normalized.contains(keyword));

    if satisfied {
        Ok(())
    } else {
        Err(GuardRejection {
            intent,
            message: intent.rejection_message(sql),
        })
    }
}
