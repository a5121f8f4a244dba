//! Database layer for Addrbook

mod connection;
mod entry_repository;
mod migrations;
mod user_repository;

#[cfg(test)]
pub(crate) mod test_support;

pub use connection::{Database, DEFAULT_BUSY_TIMEOUT};
pub use entry_repository::{EntryRepository, SqliteEntryRepository};
pub use user_repository::{SqliteUserRepository, UserRepository};
