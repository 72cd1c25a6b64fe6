//! Database connection management.
//!
//! One rusqlite `Connection` behind a `Mutex`. File databases run in WAL
//! mode; migrations are applied on open.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use orthographe_core::error::TrainerError;

use crate::migrations;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at `path` and apply pending migrations.
    pub fn open(path: &Path) -> Result<Self, TrainerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| TrainerError::Storage(format!("failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| TrainerError::Storage(format!("failed to set pragmas: {}", e)))?;

        info!(path = %path.display(), "database opened");
        Self::with_migrations(conn)
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self, TrainerError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| TrainerError::Storage(format!("failed to open in-memory db: {}", e)))?;
        Self::with_migrations(conn)
    }

    fn with_migrations(conn: Connection) -> Result<Self, TrainerError> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Run `f` with the connection locked.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, TrainerError>
    where
        F: FnOnce(&Connection) -> Result<T, TrainerError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| TrainerError::Storage(format!("database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
