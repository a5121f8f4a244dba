//! Conflict-safe entry editing
//!
//! Editing is optimistic: [`EditCoordinator::begin_edit`] hands out the entry
//! together with its current [`EntryVersion`], and the client sends that
//! version back with its changes. [`EditCoordinator::submit_edit`] re-reads
//! the entry under the write lock and only saves when the version is still
//! the same. Otherwise the changes are dropped and the caller gets the fresh
//! entry to re-apply them against. There is no field-level merging.

use serde::Serialize;

use crate::db::{Database, EntryRepository, SqliteEntryRepository};
use crate::error::{Error, Result};
use crate::models::{Entry, EntryId, EntryPatch, EntryVersion, UserId, ValidationErrors};
use crate::util::unix_millis_now;

/// An entry as handed out for editing, with the version to send back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditSession {
    pub entry: Entry,
    pub version: EntryVersion,
}

impl EditSession {
    pub const fn new(entry: Entry) -> Self {
        let version = entry.version();
        Self { entry, version }
    }
}

/// Result of submitting an edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Changes were saved
    Success(Entry),
    /// Someone else saved first; carries the current entry, nothing changed
    Conflict(Entry),
    /// Changes failed field validation; carries the stored entry, nothing changed
    Invalid {
        entry: Entry,
        errors: ValidationErrors,
    },
    /// The entry no longer exists
    NotFound(EntryId),
}

/// Coordinates concurrent edits against one database.
pub struct EditCoordinator<'a> {
    db: &'a Database,
}

impl<'a> EditCoordinator<'a> {
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Load an entry and capture its version. Takes no lock.
    pub fn begin_edit(&self, id: &EntryId) -> Result<EditSession> {
        let conn = self.db.connect()?;
        let entry = SqliteEntryRepository::new(&conn)
            .get(id)?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        Ok(EditSession::new(entry))
    }

    /// Apply `changes` if the entry still has version `captured`.
    ///
    /// The read, the version check and the write happen inside one write
    /// transaction, so concurrent submissions for the same entry run one at
    /// a time and every later one sees the earlier one's save. `Err` is only
    /// returned for store failures; every expected outcome is an
    /// [`EditOutcome`].
    pub fn submit_edit(
        &self,
        id: &EntryId,
        captured: EntryVersion,
        changes: &EntryPatch,
        editor: &UserId,
    ) -> Result<EditOutcome> {
        let mut conn = self.db.connect()?;
        let tx = Database::write_transaction(&mut conn)?;
        let repo = SqliteEntryRepository::new(&tx);

        let Some(current) = repo.get(id)? else {
            return Ok(EditOutcome::NotFound(*id));
        };

        let fields = match changes.apply(&current.fields).clean() {
            Ok(fields) => fields,
            Err(errors) => {
                return Ok(EditOutcome::Invalid {
                    entry: current,
                    errors,
                })
            }
        };

        if current.version() != captured {
            tracing::info!(
                entry = %id,
                captured = captured.as_millis(),
                current = current.version().as_millis(),
                "Edit rejected: entry changed since it was read"
            );
            return Ok(EditOutcome::Conflict(current));
        }

        let updated = Entry {
            fields,
            updated_by: editor.clone(),
            update_time: current.version().successor(unix_millis_now()).as_millis(),
            ..current
        };
        repo.update(&updated)?;
        tx.commit()?;

        tracing::debug!(entry = %id, version = updated.update_time, "Entry updated");
        Ok(EditOutcome::Success(updated))
    }
}
