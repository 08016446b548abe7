//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::record::{Predicate, Record, RecordFilter};
use crate::storage::schema::{
    apply_pending, current_version, get_schema_version, initialize_schema, revert_latest,
};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use std::path::Path;

const RECORD_COLUMNS: &str =
    "title, credentials, verified, statement, phone, location, link, accepting_appointments";

const UPSERT_SQL: &str = r#"
INSERT INTO therapists (
    title, credentials, verified, statement, phone, location, link,
    accepting_appointments, created_at, updated_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
ON CONFLICT(title) DO UPDATE SET
    credentials = excluded.credentials,
    verified = excluded.verified,
    statement = excluded.statement,
    phone = excluded.phone,
    location = excluded.location,
    link = excluded.link,
    accepting_appointments = excluded.accepting_appointments,
    updated_at = excluded.updated_at
"#;

/// Drops the row that owns a profile link under a different title
const RELEASE_LINK_SQL: &str =
    "DELETE FROM therapists WHERE link = ?1 AND link <> '' AND title <> ?2";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (creating if needed) a database file
    ///
    /// The schema is not touched; call `init` and `migrate` (or use
    /// `open_storage`) before reading or writing records.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA case_sensitive_like = ON;
        ",
        )?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA case_sensitive_like = ON;
        ",
        )?;
        Ok(Self { conn })
    }

    /// Fails unless every known migration has been applied
    fn ensure_migrated(&self) -> StorageResult<()> {
        let current = current_version(&self.conn)?;
        let required = get_schema_version();
        if current < required {
            return Err(StorageError::NotMigrated { current, required });
        }
        Ok(())
    }
}

impl Storage for SqliteStorage {
    // ===== Lifecycle =====

    fn init(&mut self) -> StorageResult<()> {
        tracing::debug!("Initializing database");
        initialize_schema(&self.conn)?;
        Ok(())
    }

    fn migrate(&mut self) -> StorageResult<Vec<u32>> {
        apply_pending(&mut self.conn)
    }

    fn rollback(&mut self) -> StorageResult<Option<u32>> {
        revert_latest(&mut self.conn)
    }

    fn schema_version(&self) -> StorageResult<u32> {
        Ok(current_version(&self.conn)?)
    }

    // ===== Writes =====

    fn upsert(&mut self, record: &Record) -> StorageResult<()> {
        self.ensure_migrated()?;
        let tx = self.conn.transaction()?;
        upsert_record(&tx, record)?;
        tx.commit()?;
        tracing::debug!("Saved therapist {}", record.title);
        Ok(())
    }

    fn upsert_all(&mut self, records: &[Record]) -> StorageResult<usize> {
        self.ensure_migrated()?;

        let tx = self.conn.transaction()?;
        for record in records {
            upsert_record(&tx, record)?;
        }
        tx.commit()?;

        tracing::debug!("Saved {} therapists", records.len());
        Ok(records.len())
    }

    // ===== Reads =====

    fn list(&self) -> StorageResult<Vec<Record>> {
        self.find(&RecordFilter::default())
    }

    fn find(&self, filter: &RecordFilter) -> StorageResult<Vec<Record>> {
        self.ensure_migrated()?;

        let (sql, values) = build_find_query(filter);
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn count(&self) -> StorageResult<u64> {
        self.ensure_migrated()?;
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM therapists", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Writes one record keyed by title
///
/// A profile link names one listing, so a stored row holding the same link
/// under another title is the same listing renamed and is replaced.
fn upsert_record(conn: &Connection, record: &Record) -> StorageResult<()> {
    let replaced = conn
        .execute(RELEASE_LINK_SQL, params![record.link, record.title])
        .map_err(|e| classify_write_error(e, record))?;
    if replaced > 0 {
        tracing::warn!(
            "Listing {} was renamed to '{}', replacing the stored row",
            record.link,
            record.title
        );
    }

    let now = Utc::now().to_rfc3339();
    conn.execute(
        UPSERT_SQL,
        params![
            record.title,
            record.credentials,
            record.verified,
            record.statement,
            record.phone,
            record.location,
            record.link,
            record.accepting_appointments,
            now,
        ],
    )
    .map_err(|e| classify_write_error(e, record))?;
    Ok(())
}

fn classify_write_error(error: rusqlite::Error, record: &Record) -> StorageError {
    match &error {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            StorageError::ConstraintViolation(format!(
                "'{}' conflicts with a stored record ({})",
                record.title, error
            ))
        }
        _ => StorageError::Sqlite(error),
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        title: row.get(0)?,
        credentials: row.get(1)?,
        verified: row.get(2)?,
        statement: row.get(3)?,
        phone: row.get(4)?,
        location: row.get(5)?,
        link: row.get(6)?,
        accepting_appointments: row.get(7)?,
    })
}

/// Builds the SELECT for a filter along with its positional parameters
fn build_find_query(filter: &RecordFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    for (column, predicate) in filter.predicates() {
        match predicate {
            Predicate::Equals(v) => {
                clauses.push(format!("{} = ?", column));
                values.push(Value::Text(v.clone()));
            }
            Predicate::Prefix(v) => {
                clauses.push(format!("{} LIKE ? ESCAPE '\\'", column));
                values.push(Value::Text(format!("{}%", escape_like(v))));
            }
            Predicate::Contains(v) => {
                clauses.push(format!("{} LIKE ? ESCAPE '\\'", column));
                values.push(Value::Text(format!("%{}%", escape_like(v))));
            }
        }
    }

    match filter.accepting_appointments {
        Some(true) => clauses.push("accepting_appointments <> ''".to_string()),
        Some(false) => clauses.push("accepting_appointments = ''".to_string()),
        None => {}
    }

    let mut sql = format!("SELECT {} FROM therapists", RECORD_COLUMNS);
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY title");

    if filter.limit.is_some() || filter.offset.is_some() {
        sql.push_str(" LIMIT ? OFFSET ?");
        values.push(Value::Integer(filter.limit.map_or(-1, i64::from)));
        values.push(Value::Integer(filter.offset.map_or(0, i64::from)));
    }

    (sql, values)
}

/// Escapes LIKE wildcards so user input matches literally
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
