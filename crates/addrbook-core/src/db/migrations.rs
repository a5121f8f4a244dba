//! Database migrations

use crate::error::Result;
use crate::util::fold_case;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

/// Current schema version
const CURRENT_VERSION: i32 = 3;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    // Hold the write lock so two processes opening a fresh file don't race
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let version = get_version(&tx)?;

    if version < 1 {
        migrate_v1(&tx)?;
    }
    if version < 2 {
        migrate_v2(&tx)?;
    }
    if version < 3 {
        migrate_v3(&tx)?;
    }

    tx.commit()?;
    if version < CURRENT_VERSION {
        tracing::info!("Migrated database from version {version} to {CURRENT_VERSION}");
    }
    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten()
        .unwrap_or(0);

    Ok(version)
}

/// Migration to version 1: users and entries
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE COLLATE NOCASE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS entries (
            id TEXT PRIMARY KEY,
            last_name TEXT NOT NULL,
            first_name TEXT NOT NULL DEFAULT '',
            birthday TEXT,
            address TEXT NOT NULL DEFAULT '',
            city TEXT NOT NULL DEFAULT '',
            state TEXT NOT NULL DEFAULT '',
            zip_code TEXT NOT NULL DEFAULT '',
            country TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            home_phone TEXT NOT NULL DEFAULT '',
            cell_phone TEXT NOT NULL DEFAULT '',
            fax TEXT NOT NULL DEFAULT '',
            spouse_last TEXT NOT NULL DEFAULT '',
            spouse_first TEXT NOT NULL DEFAULT '',
            spouse_birth TEXT,
            spouse_cell TEXT NOT NULL DEFAULT '',
            spouse_email TEXT NOT NULL DEFAULT '',
            created_by TEXT NOT NULL REFERENCES users(id),
            creation_time INTEGER NOT NULL,
            updated_by TEXT NOT NULL REFERENCES users(id),
            update_time INTEGER NOT NULL
        );
        INSERT INTO schema_version (version) VALUES (1);",
    )?;
    Ok(())
}

/// Migration to version 2: last-name search index
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_entries_last_name
            ON entries(last_name COLLATE NOCASE, first_name COLLATE NOCASE);
        INSERT INTO schema_version (version) VALUES (2);",
    )?;
    Ok(())
}

/// Migration to version 3: Unicode case-folded search and username keys
///
/// `LIKE` and `NOCASE` only fold ASCII, so the folded values are computed
/// here and on every write.
fn migrate_v3(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "ALTER TABLE entries ADD COLUMN last_name_folded TEXT NOT NULL DEFAULT '';
        ALTER TABLE users ADD COLUMN username_key TEXT NOT NULL DEFAULT '';",
    )?;

    backfill_folded(conn, "entries", "last_name", "last_name_folded")?;
    backfill_folded(conn, "users", "username", "username_key")?;

    conn.execute_batch(
        "DROP INDEX IF EXISTS idx_entries_last_name;
        CREATE INDEX IF NOT EXISTS idx_entries_last_name_folded
            ON entries(last_name_folded, first_name COLLATE NOCASE);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username_key ON users(username_key);
        INSERT INTO schema_version (version) VALUES (3);",
    )?;
    Ok(())
}

fn backfill_folded(conn: &Connection, table: &str, source: &str, target: &str) -> Result<()> {
    let mut select = conn.prepare(&format!("SELECT id, {source} FROM {table}"))?;
    let rows = select
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut update = conn.prepare(&format!("UPDATE {table} SET {target} = ? WHERE id = ?"))?;
    for (id, value) in rows {
        update.execute(params![fold_case(&value), id])?;
    }
    Ok(())
}
