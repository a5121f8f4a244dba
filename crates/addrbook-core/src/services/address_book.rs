//! Async address book service used by the HTTP front end.
//!
//! `rusqlite` is blocking, so every operation runs on tokio's blocking pool
//! with its own connection. Concurrent requests only meet inside `SQLite`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::db::{
    Database, EntryRepository, SqliteEntryRepository, SqliteUserRepository, UserRepository,
};
use crate::edit::{EditCoordinator, EditOutcome, EditSession};
use crate::models::{
    Entry, EntryForm, EntryId, EntryPatch, EntryVersion, RegistrationForm, UserId, UserProfile,
    ValidationErrors,
};
use crate::search::SearchOutcome;
use crate::{Error, Result};

/// Result of creating an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Entry),
    Invalid(ValidationErrors),
}

/// Result of registering a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered(UserProfile),
    Invalid(ValidationErrors),
}

/// Thread-safe service for address book operations.
#[derive(Clone)]
pub struct AddressBookService {
    db: Arc<Database>,
    search_limit: usize,
}

impl AddressBookService {
    /// Default cap on search results.
    pub const DEFAULT_SEARCH_LIMIT: usize = 200;

    pub fn new(db: Database, search_limit: usize) -> Self {
        Self {
            db: Arc::new(db),
            search_limit: search_limit.max(1),
        }
    }

    /// Open (and migrate) the database at `path`.
    pub async fn open_path(
        path: impl AsRef<Path>,
        busy_timeout: Duration,
        search_limit: usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = tokio::task::spawn_blocking(move || {
            Database::open_with_busy_timeout(&path, busy_timeout)
        })
        .await
        .map_err(|error| Error::Database(format!("Blocking task failed: {error}")))??;
        tracing::info!("Opened database at {}", db.path().display());
        Ok(Self::new(db, search_limit))
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let result = tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|error| Error::Database(format!("Blocking task failed: {error}")))?;

        if let Err(error) = &result {
            if error.is_lock_timeout() {
                tracing::warn!(timeout = ?self.db.busy_timeout(), "Timed out waiting for write lock");
            }
        }
        result
    }

    /// Search entries by last-name prefix.
    pub async fn search(&self, last: &str) -> Result<SearchOutcome> {
        let query = last.trim().to_string();
        let limit = self.search_limit;
        self.run_blocking(move |db| {
            let conn = db.connect()?;
            let entries = SqliteEntryRepository::new(&conn).search_by_last_name(&query, limit)?;
            tracing::debug!(query = %query, matches = entries.len(), "Searched entries");
            Ok(SearchOutcome::from_matches(&query, entries))
        })
        .await
    }

    /// Validate and insert a new entry owned by `creator`.
    pub async fn create(&self, form: EntryForm, creator: UserId) -> Result<CreateOutcome> {
        self.run_blocking(move |db| {
            let fields = match form.clean() {
                Ok(fields) => fields,
                Err(errors) => return Ok(CreateOutcome::Invalid(errors)),
            };

            let entry = Entry::new(fields, &creator);
            let conn = db.connect()?;
            SqliteEntryRepository::new(&conn).insert(&entry)?;
            tracing::info!(entry = %entry.id, "Entry created");
            Ok(CreateOutcome::Created(entry))
        })
        .await
    }

    /// Load an entry for editing.
    pub async fn begin_edit(&self, id: EntryId) -> Result<EditSession> {
        self.run_blocking(move |db| EditCoordinator::new(db).begin_edit(&id))
            .await
    }

    /// Submit changes made against `version`.
    pub async fn submit_edit(
        &self,
        id: EntryId,
        version: EntryVersion,
        changes: EntryPatch,
        editor: UserId,
    ) -> Result<EditOutcome> {
        self.run_blocking(move |db| {
            EditCoordinator::new(db).submit_edit(&id, version, &changes, &editor)
        })
        .await
    }

    /// Delete an entry, returning what was removed.
    pub async fn delete(&self, id: EntryId) -> Result<Entry> {
        self.run_blocking(move |db| {
            let mut conn = db.connect()?;
            let tx = Database::write_transaction(&mut conn)?;
            let repo = SqliteEntryRepository::new(&tx);

            let entry = repo
                .get(&id)?
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            repo.delete(&id)?;
            tx.commit()?;

            tracing::info!(entry = %id, "Entry deleted");
            Ok(entry)
        })
        .await
    }

    /// Create the profile for `subject`.
    ///
    /// The existing-profile and username checks run under the write lock, so
    /// two registrations racing for one username cannot both pass.
    pub async fn register(
        &self,
        form: RegistrationForm,
        subject: UserId,
    ) -> Result<RegistrationOutcome> {
        self.run_blocking(move |db| {
            let mut conn = db.connect()?;
            let tx = Database::write_transaction(&mut conn)?;
            let repo = SqliteUserRepository::new(&tx);

            if repo.get(&subject)?.is_some() {
                let mut errors = ValidationErrors::new();
                errors.add_non_field("You are already registered.");
                return Ok(RegistrationOutcome::Invalid(errors));
            }

            let profile = match form.clean(&subject) {
                Ok(profile) => profile,
                Err(errors) => return Ok(RegistrationOutcome::Invalid(errors)),
            };

            if repo.get_by_username(&profile.username)?.is_some() {
                let mut errors = ValidationErrors::new();
                errors.add("username", "Username is already taken.");
                return Ok(RegistrationOutcome::Invalid(errors));
            }

            repo.insert(&profile)?;
            tx.commit()?;
            tracing::info!(username = %profile.username, "User registered");
            Ok(RegistrationOutcome::Registered(profile))
        })
        .await
    }

    /// The profile registered for `id`, if any.
    pub async fn profile(&self, id: UserId) -> Result<Option<UserProfile>> {
        self.run_blocking(move |db| {
            let conn = db.connect()?;
            SqliteUserRepository::new(&conn).get(&id)
        })
        .await
    }
}
