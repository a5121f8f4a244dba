//! Database connection management

use crate::error::Result;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::migrations;

/// Default time a writer waits for another writer's lock
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to an on-disk `SQLite` database.
///
/// Holds no connection itself: each unit of work calls [`Database::connect`]
/// so concurrent requests never share a connection and coordinate only
/// through `SQLite`'s own locking.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Database {
    /// Open the database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open the database with a custom lock-wait timeout
    pub fn open_with_busy_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let database = Self { path, busy_timeout };
        let conn = database.connect()?;

        // WAL is persistent in the file; readers then never wait on the writer
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("Database journal mode: {mode}");
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        migrations::run(&conn)?;
        Ok(database)
    }

    /// Open a new configured connection
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    /// Begin a transaction that holds the write lock until commit or drop.
    ///
    /// Blocks up to the busy timeout while another writer holds the lock.
    /// Dropping the returned guard without committing rolls back.
    pub fn write_transaction(conn: &mut Connection) -> Result<Transaction<'_>> {
        Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configured lock-wait timeout
    pub const fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_file_and_parent() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("addrbook.db");
        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), path.as_path());
        assert_eq!(db.busy_timeout(), DEFAULT_BUSY_TIMEOUT);
    }

    #[test]
    fn test_connect_uses_wal() {
        let tmp = tempdir().unwrap();
        let db = Database::open(tmp.path().join("addrbook.db")).unwrap();
        let conn = db.connect().unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_ascii_lowercase(), "wal");
    }

    #[test]
    fn test_write_transaction_excludes_second_writer() {
        let tmp = tempdir().unwrap();
        let db =
            Database::open_with_busy_timeout(tmp.path().join("addrbook.db"), Duration::ZERO)
                .unwrap();

        let mut first = db.connect().unwrap();
        let mut second = db.connect().unwrap();

        let held = Database::write_transaction(&mut first).unwrap();
        let err = Database::write_transaction(&mut second).unwrap_err();
        assert!(err.is_lock_timeout());

        drop(held);
        assert!(Database::write_transaction(&mut second).is_ok());
    }

    #[test]
    fn test_readers_not_blocked_by_writer() {
        let tmp = tempdir().unwrap();
        let db =
            Database::open_with_busy_timeout(tmp.path().join("addrbook.db"), Duration::ZERO)
                .unwrap();

        let mut writer = db.connect().unwrap();
        let reader = db.connect().unwrap();

        let _held = Database::write_transaction(&mut writer).unwrap();
        let count: i64 = reader
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
