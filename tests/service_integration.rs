//! Integration tests for the metadata service over the in-memory adapters.

use std::sync::Arc;
use std::thread;

use metatier::audit::{AuditEventKind, AuditTrail, MemoryAuditSink};
use metatier::core::format::MetadataFormat;
use metatier::core::metadata::{MetadataEntry, MetadataStore, NewMetadata, UpdateMetadata};
use metatier::core::types::{MetadataKey, ResourceId, Scope};
use metatier::service::{ErrorKind, MetadataService, ServiceError};
use metatier::store::{FailOn, MemoryMetadataStore};

/// Route service logs to the test writer; filter with `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup() -> (MemoryMetadataStore, MemoryAuditSink, MetadataService) {
    init_tracing();
    let store = MemoryMetadataStore::new().recording();
    let audit = MemoryAuditSink::new();
    let service = MetadataService::new(Arc::new(store.clone()), Arc::new(audit.clone()));
    (store, audit, service)
}

fn api(id: &str) -> ResourceId {
    ResourceId::new(id).expect("valid resource id")
}

#[test]
fn duplicate_names_conflict_on_create_and_update() {
    let (_store, _audit, service) = setup();
    service.create(NewMetadata::new("Support Email")).expect("create");
    let other = service.create(NewMetadata::new("Owner")).expect("create");

    let err = service
        .create(NewMetadata::new("SUPPORT EMAIL"))
        .expect_err("duplicate create");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = service
        .update(UpdateMetadata::new(
            other.key,
            "support email",
            MetadataFormat::String,
        ))
        .expect_err("duplicate update");
    assert!(err.is_duplicate_name());
}

#[test]
fn date_is_truncated_on_create() {
    let (_store, _audit, service) = setup();
    let created = service
        .create(
            NewMetadata::new("Foo")
                .with_format(MetadataFormat::Date)
                .with_value("2024-05-01T10:00"),
        )
        .expect("create");

    let found = service
        .find_default_by_key(&created.key)
        .expect("find")
        .expect("present");
    assert_eq!(found.value.as_deref(), Some("2024-05-01"));
    assert_eq!(found.format, MetadataFormat::Date);
}

#[test]
fn standalone_format_checks() {
    let (_store, _audit, service) = setup();

    assert!(service.check_format(MetadataFormat::Numeric, Some("abc")).is_err());
    assert!(service.check_format(MetadataFormat::Numeric, Some("3.14")).is_ok());
    assert!(service.check_format(MetadataFormat::Numeric, Some("")).is_ok());

    assert!(service.check_format(MetadataFormat::Url, Some("not a url")).is_err());
    assert!(service
        .check_format(MetadataFormat::Url, Some("https://example.com/path"))
        .is_ok());

    assert!(service
        .check_format(MetadataFormat::Mail, Some("Support <support@example.com>"))
        .is_ok());
    assert!(service.check_format(MetadataFormat::Mail, Some("support")).is_err());
}

#[test]
fn create_without_format_accepts_anything() {
    let (_store, _audit, service) = setup();
    let entry = service
        .create(NewMetadata::new("Notes").with_value("<not> a url, mail, or number"))
        .expect("create");
    assert_eq!(entry.format, MetadataFormat::String);
}

#[test]
fn delete_with_two_overrides() {
    let (store, audit, service) = setup();
    let default = service
        .create(NewMetadata::new("Email").with_format(MetadataFormat::Mail))
        .expect("create");
    for id in ["api-a", "api-b"] {
        store
            .create(&MetadataEntry::override_of(
                &default,
                api(id),
                Some(format!("team@{}.example.com", id)),
            ))
            .expect("seed override");
    }
    let audits_before = audit.len();

    service.delete(&default.key).expect("delete");

    let deletes: Vec<_> = store
        .writes()
        .into_iter()
        .filter(|op| matches!(op, metatier::store::StoreOperation::Delete { .. }))
        .collect();
    assert_eq!(deletes.len(), 3);
    assert!(store.entries().is_empty());

    let records = audit.records();
    assert_eq!(records.len() - audits_before, 3);

    let global = audit.records_in(&AuditTrail::Global);
    let last = global.last().expect("global delete");
    assert_eq!(last.kind, AuditEventKind::MetadataDeleted);
    assert_eq!(last.before.as_ref(), Some(&default));
    assert!(last.after.is_none());

    for id in ["api-a", "api-b"] {
        let events = audit.records_in(&AuditTrail::Resource(api(id)));
        assert_eq!(events.len(), 1);
        let before = events[0].before.as_ref().expect("before state");
        assert_eq!(before.scope, Scope::Resource(api(id)));
        assert!(events[0].after.is_none());
    }
}

#[test]
fn delete_nonexistent_key_is_silent() {
    let (store, audit, service) = setup();
    service
        .delete(&MetadataKey::new("nothing-here").expect("key"))
        .expect("delete");
    assert!(store.writes().is_empty());
    assert!(audit.is_empty());
}

#[test]
fn override_listing_failure_leaves_default_deleted() {
    let (store, audit, service) = setup();
    let default = service.create(NewMetadata::new("Email")).expect("create");
    store
        .create(&MetadataEntry::override_of(&default, api("api-a"), None))
        .expect("seed override");
    let store = store.fail_on(FailOn::FindOverridesOf);

    let err = service.delete(&default.key).expect_err("override lookup fails");
    assert!(matches!(err, ServiceError::StorageFailure { .. }));

    store.clear_fail_on();
    assert!(service.find_default_by_key(&default.key).expect("find").is_none());
    assert_eq!(store.entries().len(), 1);
    assert_eq!(audit.records_in(&AuditTrail::Global).len(), 2);
}

#[test]
fn service_is_shareable_across_threads() {
    let (_store, _audit, service) = setup();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let service = service.clone();
            thread::spawn(move || {
                service
                    .create(NewMetadata::new(format!("Field {}", i)))
                    .expect("create")
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread");
    }

    assert_eq!(service.list_defaults().expect("list").len(), 4);
}

#[test]
fn update_round_trips_every_field() {
    let (_store, _audit, service) = setup();
    let created = service
        .create(NewMetadata::new("Launch").with_format(MetadataFormat::Date))
        .expect("create");

    let updated = service
        .update(
            UpdateMetadata::new(created.key.clone(), "Launch Day", MetadataFormat::Date)
                .with_value("2025-12-24 and later"),
        )
        .expect("update");

    let found = service
        .find_default_by_key(&created.key)
        .expect("find")
        .expect("present");
    assert_eq!(found, updated);
    assert_eq!(found.name, "Launch Day");
    assert_eq!(found.value.as_deref(), Some("2025-12-24"));
}

#[test]
fn non_ascii_names_are_listed_and_found() {
    let (_store, _audit, service) = setup();
    let han = service.create(NewMetadata::new("担当者")).expect("create");
    let cafe = service.create(NewMetadata::new("Café")).expect("create");

    assert_eq!(han.key.as_str(), "担当者");
    assert_eq!(cafe.key.as_str(), "cafe");
    assert!(service.find_default_by_key(&cafe.key).expect("find").is_some());
    assert_eq!(service.list_defaults().expect("list").len(), 2);
}
