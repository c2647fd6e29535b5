//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order.  A
//! `schema_migrations` table tracks which versions have been applied.

use querykit_common::{Error, Result};
use rusqlite::Connection;

/// V1: people table.
const V1_PEOPLE: &str = r#"
CREATE TABLE people (
    id         TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    email      TEXT UNIQUE,
    age        INTEGER NOT NULL CHECK (age >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// V2: index backing the age-range count and delete templates.
const V2_PEOPLE_AGE_INDEX: &str = r#"
CREATE INDEX idx_people_age ON people(age);
"#;

/// All migrations in version order.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_PEOPLE), (2, V2_PEOPLE_AGE_INDEX)];

/// Apply every migration that has not yet been recorded.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(Error::database)?;

        if already {
            continue;
        }

        let tx = conn.unchecked_transaction().map_err(Error::database)?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(Error::database)?;

        tx.commit().map_err(Error::database)?;

        tracing::info!("Applied migration V{version}");
    }

    Ok(())
}

/// Highest applied migration version, or 0 on a fresh database.
pub fn current_version(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(Error::database)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_create_people_table() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='people'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(current_version(&conn).unwrap(), 2);
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[test]
    fn negative_age_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO people (id, name, age, created_at, updated_at)
             VALUES ('x', 'Bad', -1, 'now', 'now')",
            [],
        );
        assert!(result.is_err());
    }
}
