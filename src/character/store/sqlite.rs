//! SQLite-backed rotation store.
//!
//! Persists used-persona sets in a single table so rotation state survives
//! process restarts and is shared by every process pointed at the same
//! database file. Each operation opens a fresh connection and runs on the
//! blocking thread pool, keeping the adapter `Send + Sync` without holding
//! a connection across await points.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use super::{RotationStore, StoreError};

/// Rotation store persisted in a SQLite database file.
pub struct SqliteRotationStore {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
}

impl SqliteRotationStore {
    /// Open (and if needed create) the store at `db_path`.
    ///
    /// # Errors
    /// Fails when the parent directory cannot be created or the schema
    /// cannot be initialized.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("creating store directory: {e}"))?;
        }

        let store = Self { db_path };
        store.initialize_db()?;
        Ok(store)
    }

    fn initialize_db(&self) -> Result<(), StoreError> {
        let conn = self.open()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS rotation_sets (
                set_key TEXT NOT NULL,
                member  TEXT NOT NULL,
                PRIMARY KEY (set_key, member)
            )",
            [],
        )
        .map_err(|e| StoreError::Backend(e.into()))?;
        Ok(())
    }

    fn open(&self) -> Result<Connection, StoreError> {
        Connection::open(&self.db_path).map_err(|e| StoreError::Unavailable {
            message: e.to_string(),
        })
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).map_err(|e| StoreError::Unavailable {
                message: e.to_string(),
            })?;
            op(&conn).map_err(|e| StoreError::Backend(e.into()))
        })
        .await
        .map_err(|e| StoreError::Unavailable {
            message: format!("blocking task failed: {e}"),
        })?
    }
}

#[async_trait]
impl RotationStore for SqliteRotationStore {
    async fn is_member(&self, set_key: &str, value: &str) -> Result<bool, StoreError> {
        let (set_key, value) = (set_key.to_string(), value.to_string());
        self.run_blocking(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM rotation_sets WHERE set_key = ?1 AND member = ?2",
                params![set_key, value],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
    }

    async fn add_member(&self, set_key: &str, value: &str) -> Result<(), StoreError> {
        let (set_key, value) = (set_key.to_string(), value.to_string());
        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO rotation_sets (set_key, member) VALUES (?1, ?2)",
                params![set_key, value],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_key(&self, set_key: &str) -> Result<(), StoreError> {
        let set_key = set_key.to_string();
        self.run_blocking(move |conn| {
            conn.execute(
                "DELETE FROM rotation_sets WHERE set_key = ?1",
                params![set_key],
            )?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn membership_survives_reopening_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("rotation.db");

        {
            let store = SqliteRotationStore::new(&db_path).unwrap();
            store.add_member("character:used:1", "Airi").await.unwrap();
        }

        let store = SqliteRotationStore::new(&db_path).unwrap();
        assert!(store.is_member("character:used:1", "Airi").await.unwrap());
        assert!(!store.is_member("character:used:1", "Luna").await.unwrap());
    }

    #[tokio::test]
    async fn delete_key_only_touches_its_own_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRotationStore::new(dir.path().join("rotation.db")).unwrap();

        store.add_member("character:used:1", "Airi").await.unwrap();
        store.add_member("character:used:2", "Airi").await.unwrap();
        store.delete_key("character:used:1").await.unwrap();

        assert!(!store.is_member("character:used:1", "Airi").await.unwrap());
        assert!(store.is_member("character:used:2", "Airi").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_adds_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRotationStore::new(dir.path().join("rotation.db")).unwrap();

        store.add_member("k", "Airi").await.unwrap();
        store.add_member("k", "Airi").await.unwrap();
        assert!(store.is_member("k", "Airi").await.unwrap());
    }
}
