//! Error types for addrbook-core

use thiserror::Error;

/// Result type alias using addrbook-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in addrbook-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Whether the store gave up waiting for another writer's lock.
    pub fn is_lock_timeout(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == rusqlite::ErrorCode::DatabaseBusy
        )
    }
}
