//! User profile repository implementation

use crate::error::Result;
use crate::models::{UserId, UserProfile};
use crate::util::fold_case;
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for user profile storage operations
pub trait UserRepository {
    /// Get a profile by user ID
    fn get(&self, id: &UserId) -> Result<Option<UserProfile>>;

    /// Get a profile by username, ignoring case (Unicode)
    fn get_by_username(&self, username: &str) -> Result<Option<UserProfile>>;

    /// Insert a new profile
    fn insert(&self, profile: &UserProfile) -> Result<()>;
}

/// `SQLite` implementation of `UserRepository`
pub struct SqliteUserRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteUserRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
        Ok(UserProfile {
            id: UserId::new(row.get::<_, String>(0)?),
            username: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn get(&self, id: &UserId) -> Result<Option<UserProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT id, username, first_name, last_name, created_at FROM users WHERE id = ?",
                params![id.as_str()],
                Self::parse_profile,
            )
            .optional()?;
        Ok(profile)
    }

    fn get_by_username(&self, username: &str) -> Result<Option<UserProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT id, username, first_name, last_name, created_at
                 FROM users WHERE username_key = ?",
                params![fold_case(username)],
                Self::parse_profile,
            )
            .optional()?;
        Ok(profile)
    }

    fn insert(&self, profile: &UserProfile) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (id, username, username_key, first_name, last_name, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                profile.id.as_str(),
                profile.username,
                fold_case(&profile.username),
                profile.first_name,
                profile.last_name,
                profile.created_at,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::TestDb;

    fn profile(id: &str, username: &str) -> UserProfile {
        UserProfile {
            id: UserId::new(id),
            username: username.to_string(),
            first_name: "Ann".to_string(),
            last_name: "Smith".to_string(),
            created_at: 1,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let test_db = TestDb::new();
        let conn = test_db.connect();
        let repo = SqliteUserRepository::new(&conn);

        let user = profile("sub-1", "ann");
        repo.insert(&user).unwrap();

        assert_eq!(repo.get(&user.id).unwrap(), Some(user));
        assert_eq!(repo.get(&UserId::new("sub-2")).unwrap(), None);
    }

    #[test]
    fn test_username_lookup_ignores_case() {
        let test_db = TestDb::new();
        let conn = test_db.connect();
        let repo = SqliteUserRepository::new(&conn);

        repo.insert(&profile("sub-1", "Ann")).unwrap();
        let found = repo.get_by_username("ANN").unwrap().unwrap();
        assert_eq!(found.id, UserId::new("sub-1"));
    }

    #[test]
    fn test_non_ascii_usernames_fold_case() {
        let test_db = TestDb::new();
        let conn = test_db.connect();
        let repo = SqliteUserRepository::new(&conn);

        repo.insert(&profile("sub-1", "Émile")).unwrap();
        let found = repo.get_by_username("émile").unwrap().unwrap();
        assert_eq!(found.username, "Émile");
        assert!(repo.insert(&profile("sub-2", "ÉMILE")).is_err());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let test_db = TestDb::new();
        let conn = test_db.connect();
        let repo = SqliteUserRepository::new(&conn);

        repo.insert(&profile("sub-1", "ann")).unwrap();
        assert!(repo.insert(&profile("sub-2", "ANN")).is_err());
    }
}
