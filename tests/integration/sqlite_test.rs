//! Guarded execution against a real SQLite database.

use db_guard::config::DatabaseConfig;
use db_guard::db::SqliteConnection;
use db_guard::{delete, insert, read, update, Connection, Outcome, Payload, Record, Value};
use pretty_assertions::assert_eq;

/// Opens an in-memory database with a small `users` table.
fn seeded() -> SqliteConnection {
    let conn = SqliteConnection::open_in_memory().unwrap();
    for sql in [
        "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL UNIQUE, name TEXT)",
        "INSERT INTO users (id, email, name) VALUES (1, 'alice@example.com', 'Alice')",
        "INSERT INTO users (id, email, name) VALUES (2, 'bob@example.com', 'Bob')",
        "INSERT INTO users (id, email, name) VALUES (3, 'carol@example.com', NULL)",
    ] {
        conn.prepare(sql).unwrap().execute().unwrap();
    }
    conn
}

#[test]
fn test_read_returns_rows_in_order() {
    let conn = seeded();
    let result = read("SELECT id, name FROM users ORDER BY id", &conn);

    assert!(result.succeeded);
    assert_eq!(result.affected_rows, Some(3));
    assert_eq!(
        result.payload,
        Payload::Records(vec![
            Record::new().with("id", 1).with("name", "Alice"),
            Record::new().with("id", 2).with("name", "Bob"),
            Record::new().with("id", 3).with("name", Value::Null),
        ])
    );
}

#[test]
fn test_read_with_no_matching_rows() {
    let conn = seeded();
    let result = read("SELECT * FROM users WHERE id = 99", &conn);

    assert!(!result.succeeded);
    assert_eq!(result.outcome, Outcome::NoMatch);
    assert_eq!(result.affected_rows, Some(0));
    assert!(result.payload.is_empty());
}

#[test]
fn test_read_after_write_is_not_confused_by_stale_changes() {
    let conn = seeded();
    assert!(update("UPDATE users SET name = 'X' WHERE id IN (1, 2)", &conn).succeeded);

    let result = read("SELECT * FROM users WHERE id = 99", &conn);
    assert_eq!(result.outcome, Outcome::NoMatch);
}

#[test]
fn test_lowercase_keywords_pass_the_guard() {
    let conn = seeded();
    let result = read("select email from users where id = 2", &conn);

    assert!(result.succeeded);
    assert_eq!(
        result.payload.records().unwrap()[0].get("email"),
        Some(&Value::from("bob@example.com"))
    );
}

#[test]
fn test_insert_reports_generated_id() {
    let conn = seeded();
    let sql = "INSERT INTO users (email, name) VALUES ('dave@example.com', 'Dave')";
    let result = insert(sql, &conn);

    assert!(result.succeeded);
    assert_eq!(result.affected_rows, Some(1));
    assert_eq!(
        result.payload,
        Payload::Inserted {
            id: Value::Int(4),
            sql: sql.to_string(),
        }
    );
}

#[test]
fn test_insert_constraint_violation_is_a_driver_failure() {
    let conn = seeded();
    let result = insert(
        "INSERT INTO users (email) VALUES ('alice@example.com')",
        &conn,
    );

    assert!(!result.succeeded);
    assert_eq!(result.outcome, Outcome::DriverFailure);
    assert_eq!(result.affected_rows, None);
    assert!(result.error_message.contains("UNIQUE constraint failed"));
}

#[test]
fn test_update_counts_changed_rows() {
    let conn = seeded();
    let result = update("UPDATE users SET name = 'Anon' WHERE name IS NULL OR id = 1", &conn);

    assert!(result.succeeded);
    assert_eq!(result.affected_rows, Some(2));
    assert!(result.payload.is_empty());
}

#[test]
fn test_update_without_where_leaves_table_untouched() {
    let conn = seeded();
    let result = update("UPDATE users SET name = 'Oops'", &conn);

    assert_eq!(result.outcome, Outcome::Rejected);

    let check = read("SELECT * FROM users WHERE name = 'Oops'", &conn);
    assert_eq!(check.outcome, Outcome::NoMatch);
}

#[test]
fn test_delete_without_where_leaves_table_untouched() {
    let conn = seeded();
    let result = delete("DELETE FROM users", &conn);

    assert_eq!(result.outcome, Outcome::Rejected);
    assert_eq!(read("SELECT * FROM users", &conn).affected_rows, Some(3));
}

#[test]
fn test_delete_removes_rows() {
    let conn = seeded();
    let result = delete("DELETE FROM users WHERE id = 2", &conn);

    assert!(result.succeeded);
    assert_eq!(result.affected_rows, Some(1));

    let again = delete("DELETE FROM users WHERE id = 2", &conn);
    assert_eq!(again.outcome, Outcome::NoMatch);
    assert!(again.error_message.contains("DELETE FROM users WHERE id = 2"));
}

#[test]
fn test_syntax_error_is_reported_verbatim() {
    let conn = seeded();
    let result = read("SELECT * FORM users", &conn);

    assert!(!result.succeeded);
    assert_eq!(result.outcome, Outcome::DriverFailure);
    assert!(result.error_message.contains("syntax error"));
    assert!(!result.error_message.starts_with("Driver error"));
}

#[test]
fn test_returning_clause_counts_returned_rows() {
    let conn = seeded();
    let result = read(
        "DELETE FROM users WHERE id > 1 RETURNING id -- select",
        &conn,
    );

    // Passes the read guard through the comment, and SQLite returns the deleted ids.
    assert!(result.succeeded);
    assert_eq!(result.affected_rows, Some(2));
}

#[test]
fn test_on_disk_database_persists_inserts() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig::with_url(format!(
        "sqlite:{}",
        dir.path().join("guard.db").display()
    ));

    {
        let conn = SqliteConnection::open(&config).unwrap();
        conn.prepare("CREATE TABLE t (id INTEGER PRIMARY KEY, a INTEGER)")
            .unwrap()
            .execute()
            .unwrap();
        assert!(insert("INSERT INTO t (a) VALUES (1)", &conn).succeeded);
    }

    let conn = SqliteConnection::open(&config).unwrap();
    let result = read("SELECT a FROM t", &conn);
    assert_eq!(
        result.payload.records(),
        Some([Record::new().with("a", 1)].as_slice())
    );
}

/// Opens an in-memory database where every write fans out through triggers
/// and a cascading foreign key.
fn with_side_effects() -> SqliteConnection {
    let conn = SqliteConnection::open_in_memory().unwrap();
    for sql in [
        "CREATE TABLE t (id INTEGER PRIMARY KEY, x INTEGER)",
        "CREATE TABLE audit (t_id INTEGER, note TEXT)",
        "CREATE TABLE children (id INTEGER PRIMARY KEY, \
         t_id INTEGER REFERENCES t(id) ON DELETE CASCADE)",
        "CREATE TRIGGER t_updated AFTER UPDATE ON t BEGIN \
         INSERT INTO audit VALUES (NEW.id, 'old'); \
         INSERT INTO audit VALUES (NEW.id, 'new'); END",
        "CREATE TRIGGER t_inserted AFTER INSERT ON t BEGIN \
         INSERT INTO audit VALUES (NEW.id, 'created'); END",
        "INSERT INTO t (id, x) VALUES (1, 0), (2, 0)",
        "INSERT INTO children (id, t_id) VALUES (10, 1), (11, 1), (12, 1)",
    ] {
        conn.prepare(sql).unwrap().execute().unwrap();
    }
    conn
}

#[test]
fn test_update_does_not_count_trigger_writes() {
    let conn = with_side_effects();
    let result = update("UPDATE t SET x = 1 WHERE id = 1", &conn);

    assert!(result.succeeded);
    assert_eq!(result.affected_rows, Some(1));
}

#[test]
fn test_insert_does_not_count_trigger_writes() {
    let conn = with_side_effects();
    let result = insert("INSERT INTO t (id, x) VALUES (7, 0)", &conn);

    assert!(result.succeeded);
    assert_eq!(result.affected_rows, Some(1));
    assert_eq!(result.payload.inserted_id(), Some(&Value::Int(7)));
}

#[test]
fn test_delete_does_not_count_cascaded_rows() {
    let conn = with_side_effects();
    let result = delete("DELETE FROM t WHERE id = 1", &conn);

    assert!(result.succeeded);
    assert_eq!(result.affected_rows, Some(1));

    let orphans = read("SELECT * FROM children WHERE t_id = 1", &conn);
    assert_eq!(orphans.outcome, Outcome::NoMatch);
}

#[test]
fn test_update_matching_nothing_fires_no_triggers() {
    let conn = with_side_effects();
    let result = update("UPDATE t SET x = 1 WHERE id = 99", &conn);

    assert_eq!(result.outcome, Outcome::NoMatch);
    assert_eq!(result.affected_rows, Some(0));
}
