//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::record::{Record, RecordFilter};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Database has migration version {0}, which this build does not know")]
    UnknownMigration(u32),

    #[error("Database schema is at version {current}, expected {required}; run `psych migrate`")]
    NotMigrated { current: u32, required: u32 },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Records are keyed by title. The lifecycle is `init` then `migrate`, once,
/// before any read or write.
pub trait Storage {
    // ===== Lifecycle =====

    /// Creates the migration bookkeeping structures
    fn init(&mut self) -> StorageResult<()>;

    /// Applies pending migrations
    ///
    /// # Returns
    ///
    /// The versions applied by this call, empty if the schema was current
    fn migrate(&mut self) -> StorageResult<Vec<u32>>;

    /// Reverts the most recent migration
    fn rollback(&mut self) -> StorageResult<Option<u32>>;

    /// Highest applied migration version
    fn schema_version(&self) -> StorageResult<u32>;

    // ===== Writes =====

    /// Inserts a record or overwrites the one with the same title
    fn upsert(&mut self, record: &Record) -> StorageResult<()>;

    /// Upserts every record in a single transaction
    ///
    /// # Returns
    ///
    /// The number of records written
    fn upsert_all(&mut self, records: &[Record]) -> StorageResult<usize>;

    // ===== Reads =====

    /// All records ordered by title
    fn list(&self) -> StorageResult<Vec<Record>>;

    /// Records matching every engaged predicate, ordered by title
    fn find(&self, filter: &RecordFilter) -> StorageResult<Vec<Record>>;

    /// Number of stored records
    fn count(&self) -> StorageResult<u64>;
}
