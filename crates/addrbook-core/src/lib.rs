//! addrbook-core - Core library for Addrbook
//!
//! This crate contains the contact models, field validation, the `SQLite`
//! record store, and the edit coordinator that keeps concurrent edits from
//! silently overwriting each other.

pub mod db;
pub mod edit;
pub mod error;
pub mod models;
pub mod search;
pub mod services;
pub mod util;

pub use edit::{EditCoordinator, EditOutcome, EditSession};
pub use error::{Error, Result};
pub use models::{Entry, EntryId, EntryVersion, UserId};
