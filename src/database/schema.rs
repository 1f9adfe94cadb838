/*!
 * Database schema definitions and migrations.
 *
 * This module contains the SQL schema for the phrase catalog and the
 * per-user progress table, and handles schema migrations for version upgrades.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // Foreign key enforcement is per connection.
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing database schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating database schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        migrate_schema(conn, current_version)?;
    } else {
        debug!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version in the database
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// Create all database tables
fn create_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create schema_version table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS phrases (
            id TEXT PRIMARY KEY,
            english TEXT NOT NULL,
            chinese TEXT NOT NULL,
            pinyin TEXT,
            category TEXT NOT NULL DEFAULT 'general',
            example TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create phrases table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_phrases_active_order
         ON phrases(is_active, sort_order, created_at)",
        [],
    )
    .context("Failed to create phrases index")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_progress (
            user_id TEXT NOT NULL,
            phrase_id TEXT NOT NULL,
            total_repetitions INTEGER NOT NULL DEFAULT 0,
            last_practiced_at TEXT NOT NULL,
            PRIMARY KEY (user_id, phrase_id),
            FOREIGN KEY (phrase_id) REFERENCES phrases(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("Failed to create user_progress table")?;

    debug!("All database tables created successfully");
    Ok(())
}

/// Migrate schema from an older version
fn migrate_schema(conn: &Connection, from_version: i32) -> Result<()> {
    // Only v1 exists so far; an older database is rebuilt in place.
    debug!("No migrations registered from v{}", from_version);
    create_all_tables(conn)?;
    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}
