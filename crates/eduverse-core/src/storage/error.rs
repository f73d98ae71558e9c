//! Storage error handling
//!
//! Typed errors for the local key-value store, with recovery suggestions
//! for the ones a user can act on.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during local storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A record could not be encoded for storage
    #[error("Failed to encode record for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Database schema is newer than this client understands
    #[error("Database schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: i32, supported: i32 },

    /// Another thread panicked while holding the store lock
    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    /// Check if this error is recoverable by retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StorageError::SchemaTooNew { .. } => {
                Some("Upgrade the client, or point data_dir at a fresh directory.")
            }
            StorageError::Database(_) if self.is_recoverable() => {
                Some("Another process is using the database. Try again shortly.")
            }
            _ => None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
