//! Entry repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::error::{Error, Result};
use crate::models::{Entry, EntryFields, EntryId, UserId};
use crate::search::like_prefix_pattern;
use crate::util::fold_case;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

const ENTRY_COLUMNS: &str = "id, last_name, first_name, birthday, address, city, state, zip_code,
    country, email, home_phone, cell_phone, fax, spouse_last, spouse_first, spouse_birth,
    spouse_cell, spouse_email, created_by, creation_time, updated_by, update_time";

/// Trait for entry storage operations
pub trait EntryRepository {
    /// Get an entry by ID
    ///
    /// Inside a transaction from `Database::write_transaction` this is the
    /// locked read: no other writer can change the row until it ends.
    fn get(&self, id: &EntryId) -> Result<Option<Entry>>;

    /// Insert a new entry
    fn insert(&self, entry: &Entry) -> Result<()>;

    /// Overwrite an existing entry's fields and update stamp
    fn update(&self, entry: &Entry) -> Result<()>;

    /// Delete an entry
    fn delete(&self, id: &EntryId) -> Result<()>;

    /// Entries whose last name starts with `prefix`, ignoring case (Unicode)
    fn search_by_last_name(&self, prefix: &str, limit: usize) -> Result<Vec<Entry>>;

    /// Total number of entries
    fn count(&self) -> Result<usize>;
}

/// `SQLite` implementation of `EntryRepository`
pub struct SqliteEntryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteEntryRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse an entry from a database row
    fn parse_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entry> {
        let id: String = row.get(0)?;
        let id = id.parse().map_err(|error: uuid::Error| {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(error))
        })?;
        Ok(Entry {
            id,
            fields: EntryFields {
                last_name: row.get(1)?,
                first_name: row.get(2)?,
                birthday: row.get(3)?,
                address: row.get(4)?,
                city: row.get(5)?,
                state: row.get(6)?,
                zip_code: row.get(7)?,
                country: row.get(8)?,
                email: row.get(9)?,
                home_phone: row.get(10)?,
                cell_phone: row.get(11)?,
                fax: row.get(12)?,
                spouse_last: row.get(13)?,
                spouse_first: row.get(14)?,
                spouse_birth: row.get(15)?,
                spouse_cell: row.get(16)?,
                spouse_email: row.get(17)?,
            },
            created_by: UserId::new(row.get::<_, String>(18)?),
            creation_time: row.get(19)?,
            updated_by: UserId::new(row.get::<_, String>(20)?),
            update_time: row.get(21)?,
        })
    }
}

impl EntryRepository for SqliteEntryRepository<'_> {
    fn get(&self, id: &EntryId) -> Result<Option<Entry>> {
        let entry = self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?"),
                params![id.as_str()],
                Self::parse_entry,
            )
            .optional()?;
        Ok(entry)
    }

    fn insert(&self, entry: &Entry) -> Result<()> {
        let f = &entry.fields;
        self.conn.execute(
            &format!(
                "INSERT INTO entries ({ENTRY_COLUMNS}, last_name_folded)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            params![
                entry.id.as_str(),
                f.last_name,
                f.first_name,
                f.birthday,
                f.address,
                f.city,
                f.state,
                f.zip_code,
                f.country,
                f.email,
                f.home_phone,
                f.cell_phone,
                f.fax,
                f.spouse_last,
                f.spouse_first,
                f.spouse_birth,
                f.spouse_cell,
                f.spouse_email,
                entry.created_by.as_str(),
                entry.creation_time,
                entry.updated_by.as_str(),
                entry.update_time,
                fold_case(&f.last_name),
            ],
        )?;
        Ok(())
    }

    fn update(&self, entry: &Entry) -> Result<()> {
        let f = &entry.fields;
        let rows = self.conn.execute(
            "UPDATE entries SET
                last_name = ?, first_name = ?, birthday = ?, address = ?, city = ?,
                state = ?, zip_code = ?, country = ?, email = ?, home_phone = ?,
                cell_phone = ?, fax = ?, spouse_last = ?, spouse_first = ?,
                spouse_birth = ?, spouse_cell = ?, spouse_email = ?,
                updated_by = ?, update_time = ?, last_name_folded = ?
             WHERE id = ?",
            params![
                f.last_name,
                f.first_name,
                f.birthday,
                f.address,
                f.city,
                f.state,
                f.zip_code,
                f.country,
                f.email,
                f.home_phone,
                f.cell_phone,
                f.fax,
                f.spouse_last,
                f.spouse_first,
                f.spouse_birth,
                f.spouse_cell,
                f.spouse_email,
                entry.updated_by.as_str(),
                entry.update_time,
                fold_case(&f.last_name),
                entry.id.as_str(),
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(entry.id.to_string()));
        }
        Ok(())
    }

    fn delete(&self, id: &EntryId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?", params![id.as_str()])?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn search_by_last_name(&self, prefix: &str, limit: usize) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS}
             FROM entries
             WHERE last_name_folded LIKE ? ESCAPE '\\'
             ORDER BY last_name_folded, first_name COLLATE NOCASE, id
             LIMIT ?"
        ))?;

        let entries = stmt
            .query_map(
                params![like_prefix_pattern(&fold_case(prefix)), limit as i64],
                Self::parse_entry,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    fn count(&self) -> Result<usize> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{seed_user, TestDb};
    use pretty_assertions::assert_eq;

    fn fields(last: &str, first: &str) -> EntryFields {
        EntryFields {
            last_name: last.to_string(),
            first_name: first.to_string(),
            ..EntryFields::default()
        }
    }

    #[test]
    fn test_insert_and_get() {
        let test_db = TestDb::new();
        let conn = test_db.connect();
        let user = seed_user(&conn, "sub-1", "ann");
        let repo = SqliteEntryRepository::new(&conn);

        let mut entry_fields = fields("Smith", "Ann");
        entry_fields.birthday = chrono::NaiveDate::from_ymd_opt(1980, 2, 29);
        let entry = Entry::new(entry_fields, &user);
        repo.insert(&entry).unwrap();

        let fetched = repo.get(&entry.id).unwrap().unwrap();
        assert_eq!(fetched, entry);
    }

    #[test]
    fn test_get_missing() {
        let test_db = TestDb::new();
        let conn = test_db.connect();
        let repo = SqliteEntryRepository::new(&conn);
        assert!(repo.get(&EntryId::new()).unwrap().is_none());
    }

    #[test]
    fn test_update() {
        let test_db = TestDb::new();
        let conn = test_db.connect();
        let user = seed_user(&conn, "sub-1", "ann");
        let other = seed_user(&conn, "sub-2", "bob");
        let repo = SqliteEntryRepository::new(&conn);

        let mut entry = Entry::new(fields("Smith", "Ann"), &user);
        repo.insert(&entry).unwrap();

        entry.fields.city = "Boston".to_string();
        entry.updated_by = other.clone();
        entry.update_time += 10;
        repo.update(&entry).unwrap();

        let fetched = repo.get(&entry.id).unwrap().unwrap();
        assert_eq!(fetched.fields.city, "Boston");
        assert_eq!(fetched.updated_by, other);
        assert_eq!(fetched.created_by, user);
        assert_eq!(fetched.update_time, entry.update_time);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let test_db = TestDb::new();
        let conn = test_db.connect();
        let user = seed_user(&conn, "sub-1", "ann");
        let repo = SqliteEntryRepository::new(&conn);

        let entry = Entry::new(fields("Smith", "Ann"), &user);
        assert!(matches!(repo.update(&entry), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_delete() {
        let test_db = TestDb::new();
        let conn = test_db.connect();
        let user = seed_user(&conn, "sub-1", "ann");
        let repo = SqliteEntryRepository::new(&conn);

        let entry = Entry::new(fields("Smith", "Ann"), &user);
        repo.insert(&entry).unwrap();
        repo.delete(&entry.id).unwrap();

        assert!(repo.get(&entry.id).unwrap().is_none());
        assert!(matches!(repo.delete(&entry.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_search_prefix_case_insensitive() {
        let test_db = TestDb::new();
        let conn = test_db.connect();
        let user = seed_user(&conn, "sub-1", "ann");
        let repo = SqliteEntryRepository::new(&conn);

        let people = [
            ("Smith", "Bob"),
            ("smithers", "Ann"),
            ("Smith", "Ann"),
            ("Jones", "Al"),
        ];
        for (last, first) in people {
            repo.insert(&Entry::new(fields(last, first), &user)).unwrap();
        }

        let found = repo.search_by_last_name("SMI", 10).unwrap();
        let names: Vec<String> = found.iter().map(Entry::display_name).collect();
        assert_eq!(names, vec!["Smith, Ann", "Smith, Bob", "smithers, Ann"]);

        assert_eq!(repo.search_by_last_name("", 10).unwrap().len(), 4);
        assert_eq!(repo.search_by_last_name("smi", 2).unwrap().len(), 2);
        assert_eq!(repo.count().unwrap(), 4);
    }

    #[test]
    fn test_search_folds_non_ascii_case() {
        let test_db = TestDb::new();
        let conn = test_db.connect();
        let user = seed_user(&conn, "sub-1", "ann");
        let repo = SqliteEntryRepository::new(&conn);

        let mut emile = Entry::new(fields("Émile", ""), &user);
        repo.insert(&emile).unwrap();
        repo.insert(&Entry::new(fields("Ötzi", ""), &user)).unwrap();

        assert_eq!(repo.search_by_last_name("ém", 10).unwrap(), vec![emile.clone()]);
        assert_eq!(repo.search_by_last_name("ÉM", 10).unwrap().len(), 1);
        assert_eq!(repo.search_by_last_name("öt", 10).unwrap().len(), 1);

        emile.fields.last_name = "Øster".to_string();
        repo.update(&emile).unwrap();
        assert!(repo.search_by_last_name("ém", 10).unwrap().is_empty());
        assert_eq!(repo.search_by_last_name("øs", 10).unwrap(), vec![emile]);
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let test_db = TestDb::new();
        let conn = test_db.connect();
        let user = seed_user(&conn, "sub-1", "ann");
        let repo = SqliteEntryRepository::new(&conn);

        repo.insert(&Entry::new(fields("O_Hara", ""), &user)).unwrap();
        repo.insert(&Entry::new(fields("OXHara", ""), &user)).unwrap();
        repo.insert(&Entry::new(fields("100%", ""), &user)).unwrap();

        assert_eq!(repo.search_by_last_name("O_", 10).unwrap().len(), 1);
        assert_eq!(repo.search_by_last_name("%", 10).unwrap().len(), 0);
        assert_eq!(repo.search_by_last_name("100%", 10).unwrap().len(), 1);
    }
}
