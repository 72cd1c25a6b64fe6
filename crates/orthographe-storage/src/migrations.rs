//! Database schema migrations, tracked in `schema_migrations`.

use rusqlite::Connection;
use tracing::info;

use orthographe_core::error::TrainerError;

/// Apply every migration newer than the recorded schema version.
pub fn run_migrations(conn: &Connection) -> Result<(), TrainerError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| TrainerError::Storage(format!("failed to create migrations table: {}", e)))?;

    let current_version = schema_version(conn)?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("applied migration v1: kv_store");
    }

    Ok(())
}

pub fn schema_version(conn: &Connection) -> Result<i64, TrainerError> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| TrainerError::Storage(format!("failed to query migration version: {}", e)))
}

/// Version 1: key-value table holding JSON documents.
fn apply_v1(conn: &Connection) -> Result<(), TrainerError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS kv_store (
            key         TEXT PRIMARY KEY NOT NULL,
            value       TEXT NOT NULL,
            updated_at  INTEGER NOT NULL
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'kv_store');
        ",
    )
    .map_err(|e| TrainerError::Storage(format!("migration v1 failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 1);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_kv_store_schema() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES ('k', 'v', 1)",
            [],
        )
        .unwrap();
        let duplicate = conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES ('k', 'w', 2)",
            [],
        );
        assert!(duplicate.is_err());
    }
}
