//! In-memory key-value store

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{KeyValueStore, StorageError, StorageResult};

/// Key-value store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_entries<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> T,
    ) -> StorageResult<T> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(f(&mut entries))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.with_entries(|entries| {
            entries.remove(key);
        })
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.with_entries(|entries| {
            entries
                .range(prefix.to_string()..)
                .take_while(|(key, _)| key.starts_with(prefix))
                .map(|(key, _)| key.clone())
                .collect()
        })
    }
}
