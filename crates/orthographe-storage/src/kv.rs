use std::sync::Arc;

use chrono::Utc;
use rusqlite::OptionalExtension;

use orthographe_core::error::TrainerError;

use crate::db::Database;

/// String values stored under string keys in `kv_store`.
#[derive(Debug, Clone)]
pub struct KeyValueRepository {
    db: Arc<Database>,
}

impl KeyValueRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, TrainerError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| TrainerError::Storage(format!("failed to read {}: {}", key, e)))
        })
    }

    /// Insert or replace the value under `key`.
    pub fn put(&self, key: &str, value: &str) -> Result<(), TrainerError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                rusqlite::params![key, value, Utc::now().timestamp()],
            )
            .map_err(|e| TrainerError::Storage(format!("failed to write {}: {}", key, e)))?;
            Ok(())
        })
    }

    /// Remove `key`; returns whether a row was deleted.
    pub fn delete(&self, key: &str) -> Result<bool, TrainerError> {
        self.db.with_conn(|conn| {
            let rows = conn
                .execute("DELETE FROM kv_store WHERE key = ?1", rusqlite::params![key])
                .map_err(|e| TrainerError::Storage(format!("failed to delete {}: {}", key, e)))?;
            Ok(rows > 0)
        })
    }

    /// Unix timestamp of the last write to `key`.
    pub fn updated_at(&self, key: &str) -> Result<Option<i64>, TrainerError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT updated_at FROM kv_store WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| TrainerError::Storage(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> KeyValueRepository {
        KeyValueRepository::new(Arc::new(Database::in_memory().unwrap()))
    }

    #[test]
    fn test_get_missing_key() {
        assert_eq!(repo().get("absent").unwrap(), None);
    }

    #[test]
    fn test_put_overwrites() {
        let repo = repo();
        repo.put("progress", "{}").unwrap();
        repo.put("progress", "{\"catalogs\":{}}").unwrap();
        assert_eq!(
            repo.get("progress").unwrap().as_deref(),
            Some("{\"catalogs\":{}}")
        );
        assert!(repo.updated_at("progress").unwrap().is_some());
    }

    #[test]
    fn test_delete() {
        let repo = repo();
        repo.put("k", "v").unwrap();
        assert!(repo.delete("k").unwrap());
        assert!(!repo.delete("k").unwrap());
        assert_eq!(repo.get("k").unwrap(), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");
        {
            let repo = KeyValueRepository::new(Arc::new(Database::open(&path).unwrap()));
            repo.put("k", "persisted").unwrap();
        }
        let repo = KeyValueRepository::new(Arc::new(Database::open(&path).unwrap()));
        assert_eq!(repo.get("k").unwrap().as_deref(), Some("persisted"));
    }
}
