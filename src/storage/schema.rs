//! Database schema definitions and migrations
//!
//! The schema evolves through numbered migrations. Applied versions are
//! recorded in `schema_migrations`; each migration carries the SQL to apply
//! it and the SQL to revert it.

use crate::storage::traits::{StorageError, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

/// Bookkeeping table for applied migrations
pub const MIGRATIONS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#;

/// One reversible schema change
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

/// All migrations in application order
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_therapists_table",
        up: r#"
CREATE TABLE IF NOT EXISTS therapists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE,
    credentials TEXT NOT NULL DEFAULT '',
    verified TEXT NOT NULL DEFAULT '',
    statement TEXT NOT NULL DEFAULT '',
    phone TEXT NOT NULL DEFAULT '',
    location TEXT NOT NULL DEFAULT '',
    link TEXT NOT NULL DEFAULT '',
    accepting_appointments TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#,
        down: "DROP TABLE IF EXISTS therapists;",
    },
    Migration {
        version: 2,
        name: "add_therapist_link_index",
        // Listings without a profile link may repeat the empty value
        up: "CREATE UNIQUE INDEX IF NOT EXISTS idx_therapists_link ON therapists(link) WHERE link <> '';",
        down: "DROP INDEX IF EXISTS idx_therapists_link;",
    },
];

/// Creates the migrations bookkeeping table
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Table exists
/// * `Err(rusqlite::Error)` - Failed to create it
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(MIGRATIONS_TABLE_SQL)
}

/// Highest applied migration version, 0 for a fresh database
pub fn current_version(conn: &Connection) -> Result<u32, rusqlite::Error> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
}

/// Applies every pending migration, each in its own transaction
///
/// # Returns
///
/// The versions that were applied, in order
pub fn apply_pending(conn: &mut Connection) -> StorageResult<Vec<u32>> {
    let current = current_version(conn)?;
    let mut applied = Vec::new();

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.up)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        tracing::info!("Applied migration {} ({})", migration.version, migration.name);
        applied.push(migration.version);
    }

    if applied.is_empty() {
        tracing::debug!("No pending migrations (schema version {})", current);
    }

    Ok(applied)
}

/// Reverts the most recently applied migration
///
/// # Returns
///
/// The reverted version, or `None` if nothing was applied
pub fn revert_latest(conn: &mut Connection) -> StorageResult<Option<u32>> {
    let latest: Option<u32> = conn
        .query_row(
            "SELECT version FROM schema_migrations ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    let Some(version) = latest else {
        tracing::info!("No migrations to roll back");
        return Ok(None);
    };

    let Some(migration) = MIGRATIONS.iter().find(|m| m.version == version) else {
        return Err(StorageError::UnknownMigration(version));
    };

    let tx = conn.transaction()?;
    tx.execute_batch(migration.down)?;
    tx.execute(
        "DELETE FROM schema_migrations WHERE version = ?1",
        params![version],
    )?;
    tx.commit()?;

    tracing::info!("Rolled back migration {} ({})", version, migration.name);
    Ok(Some(version))
}

/// Latest schema version this build knows about
pub fn get_schema_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}
