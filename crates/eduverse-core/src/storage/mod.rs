//! Storage layer
//!
//! Local key-value persistence for drafts and session data.
//!
//! ## Architecture
//!
//! - **`KeyValueStore`**: async trait over a flat, string-keyed namespace.
//!   Keys are namespaced by prefix (e.g. `@eduverse_drafts_<id>`); values
//!   are JSON text. Writers to the same key are last-write-wins.
//! - **`SqliteStore`**: on-disk implementation (`<data_dir>/eduverse.db`)
//! - **`MemoryStore`**: in-process implementation for tests and throwaway
//!   sessions

use std::sync::Arc;

use async_trait::async_trait;

pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::SqliteStore;

/// A string-keyed store of JSON text values
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `None` when the key is absent
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any existing one
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a value; removing an absent key is not an error
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// All keys starting with `prefix`, in ascending order
    async fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Read several values at once, preserving the order of `keys`
    async fn get_many(&self, keys: &[String]) -> StorageResult<Vec<(String, Option<String>)>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push((key.clone(), self.get(key).await?));
        }
        Ok(values)
    }
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        (**self).keys_with_prefix(prefix).await
    }

    async fn get_many(&self, keys: &[String]) -> StorageResult<Vec<(String, Option<String>)>> {
        (**self).get_many(keys).await
    }
}
