//! Storage module for persisting extracted listings
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and versioned migrations
//! - Upserting records by title
//! - Listing and filtered reads

mod schema;
mod sqlite;
mod traits;

pub use schema::{get_schema_version, Migration, MIGRATIONS};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use std::path::Path;

/// Opens a database and brings its schema up to date
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Ready for reads and writes
/// * `Err(StorageError)` - Failed to open or migrate
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    let mut storage = SqliteStorage::open(path)?;
    storage.init()?;
    storage.migrate()?;
    Ok(storage)
}
