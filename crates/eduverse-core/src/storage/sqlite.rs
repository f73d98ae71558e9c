//! SQLite-backed key-value store
//!
//! Stores every record in the `kv` table of `<data_dir>/eduverse.db`.
//! The connection lives behind a mutex that is held for a single
//! statement at a time.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::schema::{get_schema_version, init_schema, needs_init, SCHEMA_VERSION};
use super::{KeyValueStore, StorageError, StorageResult};
use crate::config::Config;

/// On-disk key-value store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database in the configured data directory
    pub fn open(config: &Config) -> StorageResult<Self> {
        Self::open_path(&config.database_path())
    }

    /// Open or create the database at a specific path
    pub fn open_path(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        debug!("Opened key-value store at {:?}", path);
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        if let Some(found) = get_schema_version(&conn).ok().flatten() {
            if found > SCHEMA_VERSION {
                return Err(StorageError::SchemaTooNew {
                    found,
                    supported: SCHEMA_VERSION,
                });
            }
        }

        if needs_init(&conn) {
            init_schema(&conn)?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Number of stored records
    pub fn len(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn()?
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.conn()?.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        // substr comparison instead of LIKE: prefixes contain '_' wildcards
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT key FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )?;
        let keys = stmt
            .query_map([prefix], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("@token", "abc").await.unwrap();
        assert_eq!(store.get("@token").await.unwrap().as_deref(), Some("abc"));
        assert!(store.get("@user").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("k", "first").await.unwrap();
        store.set("k", "second").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("second"));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("k", "v").await.unwrap();
        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_prefix_does_not_treat_underscore_as_wildcard() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("@drafts_1", "{}").await.unwrap();
        store.set("@draftsX1", "{}").await.unwrap();
        store.set("@drafts_0", "{}").await.unwrap();

        let keys = store.keys_with_prefix("@drafts_").await.unwrap();
        assert_eq!(keys, vec!["@drafts_0", "@drafts_1"]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("eduverse.db");

        {
            let store = SqliteStore::open_path(&path).unwrap();
            store.set("@drafts_1", r#"{"title":"x"}"#).await.unwrap();
        }

        let store = SqliteStore::open_path(&path).unwrap();
        assert_eq!(
            store.get("@drafts_1").await.unwrap().as_deref(),
            Some(r#"{"title":"x"}"#)
        );
    }

    #[test]
    fn test_rejects_newer_schema() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("eduverse.db");
        {
            let conn = Connection::open(&path).unwrap();
            init_schema(&conn).unwrap();
            conn.execute(
                "UPDATE schema_info SET value = '99' WHERE key = 'version'",
                [],
            )
            .unwrap();
        }

        let result = SqliteStore::open_path(&path);
        assert!(matches!(
            result,
            Err(StorageError::SchemaTooNew { found: 99, .. })
        ));
    }
}
