//! Integration tests for persistence and queries

use psych::query::therapists;
use psych::record::{dedup_records, Predicate, Record, RecordFilter};
use psych::storage::{get_schema_version, open_storage, SqliteStorage, Storage, StorageError};
use tempfile::TempDir;

fn listing(title: &str, phone: &str, accepting: &str) -> Record {
    Record {
        phone: phone.to_string(),
        accepting_appointments: accepting.to_string(),
        credentials: "Licensed Professional Counselor, LPC".to_string(),
        location: "Tacoma, WA 98402".to_string(),
        link: format!(
            "https://www.psychologytoday.com/profile/{}",
            title.to_lowercase().replace(' ', "-")
        ),
        ..Record::new(title)
    }
}

#[test]
fn test_dedup_then_persist() {
    let dir = TempDir::new().unwrap();
    let mut storage = open_storage(&dir.path().join("psych.db")).unwrap();

    let crawled = vec![
        listing("Jane Smith", "111", ""),
        listing("John Doe", "222", "Accepting New Clients"),
        listing("Jane Smith", "333", "Accepting New Clients"),
    ];
    let unique = dedup_records(crawled);
    assert_eq!(unique.len(), 2);

    assert_eq!(storage.upsert_all(&unique).unwrap(), 2);
    assert_eq!(storage.count().unwrap(), 2);

    let jane = &therapists(&storage, Some(&RecordFilter::new().title(Predicate::equals("Jane Smith"))))
        .unwrap()[0];
    assert_eq!(jane.phone, "333");
    assert!(jane.is_accepting());
}

#[test]
fn test_repeated_crawls_update_in_place() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("psych.db");

    {
        let mut storage = open_storage(&path).unwrap();
        storage
            .upsert_all(&[listing("Jane Smith", "111", ""), listing("John Doe", "222", "")])
            .unwrap();
    }

    let mut storage = open_storage(&path).unwrap();
    storage
        .upsert_all(&[listing("Jane Smith", "999", "Accepting New Clients")])
        .unwrap();

    let all = storage.list().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].title, "Jane Smith");
    assert_eq!(all[0].phone, "999");
    assert_eq!(all[1].title, "John Doe");
}

#[test]
fn test_filtered_queries() {
    let mut storage = SqliteStorage::open_in_memory().unwrap();
    storage.init().unwrap();
    storage.migrate().unwrap();
    storage
        .upsert_all(&[
            listing("Dr. Ann Lee", "(253) 555-0101", "Accepting New Clients"),
            listing("Dr. Ben Ortiz", "(206) 555-0102", ""),
            listing("Cara Nguyen", "(253) 555-0103", "Accepting New Clients"),
        ])
        .unwrap();

    let doctors = therapists(&storage, Some(&RecordFilter::new().title(Predicate::prefix("Dr."))))
        .unwrap();
    assert_eq!(doctors.len(), 2);

    let tacoma_accepting = RecordFilter::new()
        .phone(Predicate::prefix("(253)"))
        .accepting(true);
    let found = therapists(&storage, Some(&tacoma_accepting)).unwrap();
    let names: Vec<&str> = found.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(names, vec!["Cara Nguyen", "Dr. Ann Lee"]);

    let not_accepting = therapists(&storage, Some(&RecordFilter::new().accepting(false))).unwrap();
    assert_eq!(not_accepting.len(), 1);
    assert_eq!(not_accepting[0].title, "Dr. Ben Ortiz");

    let page = therapists(&storage, Some(&RecordFilter::new().limit(1).offset(1))).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].title, "Dr. Ann Lee");

    // Storage-side filtering agrees with in-memory evaluation
    let filter = RecordFilter::new().credentials(Predicate::contains("Counselor"));
    let stored = therapists(&storage, Some(&filter)).unwrap();
    let in_memory: Vec<Record> = storage
        .list()
        .unwrap()
        .into_iter()
        .filter(|r| filter.matches(r))
        .collect();
    assert_eq!(stored, in_memory);
}

#[test]
fn test_query_without_filter_lists_everything() {
    let mut storage = SqliteStorage::open_in_memory().unwrap();
    storage.init().unwrap();
    storage.migrate().unwrap();
    storage
        .upsert_all(&[listing("Zed", "", ""), listing("Amy", "", "")])
        .unwrap();

    let everything = therapists(&storage, None).unwrap();
    assert_eq!(everything, storage.list().unwrap());
    assert_eq!(everything[0].title, "Amy");
}

#[test]
fn test_migration_lifecycle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("psych.db");

    let mut storage = SqliteStorage::open(&path).unwrap();
    storage.init().unwrap();
    assert_eq!(storage.schema_version().unwrap(), 0);

    // Writes are refused until the schema is current
    assert!(matches!(
        storage.upsert(&Record::new("Early")),
        Err(StorageError::NotMigrated { .. })
    ));

    let applied = storage.migrate().unwrap();
    assert_eq!(applied.len() as u32, get_schema_version());
    assert!(storage.migrate().unwrap().is_empty());

    assert_eq!(storage.rollback().unwrap(), Some(get_schema_version()));
    assert_eq!(storage.schema_version().unwrap(), get_schema_version() - 1);

    assert_eq!(storage.migrate().unwrap(), vec![get_schema_version()]);
    storage.upsert(&Record::new("Late")).unwrap();
    assert_eq!(storage.count().unwrap(), 1);
}

#[test]
fn test_renamed_listing_is_saved_on_next_crawl() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("psych.db");

    {
        let mut storage = open_storage(&path).unwrap();
        storage.upsert_all(&[listing("Jane Smith", "111", "")]).unwrap();
    }

    // The same profile reappears under a new display name next to a new listing
    let renamed = Record {
        title: "Jane Smith, PhD".to_string(),
        ..listing("Jane Smith", "444", "Accepting New Clients")
    };
    let mut storage = open_storage(&path).unwrap();
    let saved = storage
        .upsert_all(&[renamed.clone(), listing("Brand New Listing", "555", "")])
        .unwrap();
    assert_eq!(saved, 2);

    let all = storage.list().unwrap();
    let names: Vec<&str> = all.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(names, vec!["Brand New Listing", "Jane Smith, PhD"]);
    assert_eq!(all[1], renamed);
}
