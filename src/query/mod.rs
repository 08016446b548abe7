//! Query layer over stored records
//!
//! A single entry point accepts an optional filter and returns the matching
//! records, or everything when no filter is given.

use crate::record::{Record, RecordFilter};
use crate::storage::{Storage, StorageResult};

/// Returns the therapists matching `filter`, or all of them
///
/// # Example
///
/// ```
/// use psych::query;
/// use psych::record::{Predicate, Record, RecordFilter};
/// use psych::storage::{SqliteStorage, Storage};
///
/// let mut storage = SqliteStorage::open_in_memory().unwrap();
/// storage.init().unwrap();
/// storage.migrate().unwrap();
/// storage.upsert(&Record::new("Jane Smith")).unwrap();
///
/// let filter = RecordFilter::new().title(Predicate::prefix("Jane"));
/// assert_eq!(query::therapists(&storage, Some(&filter)).unwrap().len(), 1);
/// assert_eq!(query::therapists(&storage, None).unwrap().len(), 1);
/// ```
pub fn therapists(
    storage: &dyn Storage,
    filter: Option<&RecordFilter>,
) -> StorageResult<Vec<Record>> {
    match filter {
        Some(filter) if !filter.is_empty() => storage.find(filter),
        _ => storage.list(),
    }
}
