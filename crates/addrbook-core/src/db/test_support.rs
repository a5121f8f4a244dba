//! Helpers shared by database tests

use rusqlite::Connection;
use tempfile::TempDir;

use super::{Database, SqliteUserRepository, UserRepository};
use crate::models::{UserId, UserProfile};

/// A migrated database in a temporary directory, removed on drop.
pub struct TestDb {
    pub db: Database,
    _dir: TempDir,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("addrbook.db")).unwrap();
        Self { db, _dir: dir }
    }

    pub fn connect(&self) -> Connection {
        self.db.connect().unwrap()
    }
}

/// Insert a profile so entries can reference it.
pub fn seed_user(conn: &Connection, id: &str, username: &str) -> UserId {
    let profile = UserProfile {
        id: UserId::new(id),
        username: username.to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        created_at: crate::util::unix_millis_now(),
    };
    SqliteUserRepository::new(conn).insert(&profile).unwrap();
    profile.id
}
