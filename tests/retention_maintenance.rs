//! Retention and maintenance scenarios
//!
//! Expiry mapping per retention class, the sweep contract (counts, audit
//! entries, error isolation), single-use consumption independent of any
//! expiry value, and the export bundle.

use chrono::{DateTime, Duration, Utc};

use tile_forge::audit::AuditAction;
use tile_forge::export::build_export;
use tile_forge::maintenance::{authorize, Maintenance};
use tile_forge::pipeline::{UploadPipeline, UploadRequest};
use tile_forge::retention::{is_expired, RetentionClass};
use tile_forge::store::{MemoryStore, MetadataStore, ObjectStore};

fn t0() -> DateTime<Utc> {
    "2026-03-01T00:00:00Z".parse().unwrap()
}

fn upload(
    store: &MemoryStore,
    name: &str,
    retention: RetentionClass,
    at: DateTime<Utc>,
) -> String {
    UploadPipeline::new(store, store)
        .upload(
            UploadRequest {
                file_name: name.to_string(),
                mime_type: "text/plain".to_string(),
                bytes: format!("contents of {name}").into_bytes(),
                retention,
                password: None,
            },
            at,
        )
        .unwrap()
        .id
}

#[test]
fn test_expiry_instants_per_class() {
    let store = MemoryStore::new();
    upload(&store, "h.txt", RetentionClass::OneHour, t0());
    upload(&store, "d.txt", RetentionClass::OneDay, t0());
    upload(&store, "w.txt", RetentionClass::SevenDays, t0());
    upload(&store, "n.txt", RetentionClass::Never, t0());

    for file in store.files().unwrap() {
        let expected = match file.security.retention_class {
            RetentionClass::OneHour => Some(t0() + Duration::hours(1)),
            RetentionClass::OneDay => Some(t0() + Duration::hours(24)),
            RetentionClass::SevenDays => Some(t0() + Duration::days(7)),
            _ => None,
        };
        assert_eq!(file.security.expires_at, expected, "{}", file.file_name);
    }
}

#[test]
fn test_expiry_predicate_over_time() {
    let store = MemoryStore::new();
    upload(&store, "h.txt", RetentionClass::OneHour, t0());
    let file = store.files().unwrap().remove(0);

    assert!(!is_expired(file.security.expires_at, t0()));
    assert!(!is_expired(
        file.security.expires_at,
        t0() + Duration::minutes(59)
    ));
    assert!(is_expired(
        file.security.expires_at,
        t0() + Duration::hours(1)
    ));
}

#[test]
fn test_single_use_deletion_ignores_expiry() {
    let store = MemoryStore::new();
    let id = upload(&store, "once.txt", RetentionClass::SingleUse, t0());

    // Whatever expiry a record might carry is irrelevant: consumption
    // deletes synchronously.
    let pipeline = UploadPipeline::new(&store, &store);
    let opened = pipeline.open(&id, None, t0()).unwrap();
    assert!(pipeline.consume_if_single_use(&opened.record, t0()).unwrap());

    assert!(store.file(&id).is_err());
    assert!(store.get(&opened.record.object_key).is_err());

    let audit = store.audit_for(&id).unwrap();
    let delete = audit
        .iter()
        .find(|e| e.action == AuditAction::Delete)
        .unwrap();
    assert_eq!(delete.reason, "single_use_consumed");
}

#[test]
fn test_sweep_lifecycle_end_to_end() {
    let store = MemoryStore::new();
    upload(&store, "h.txt", RetentionClass::OneHour, t0());
    upload(&store, "d.txt", RetentionClass::OneDay, t0());
    upload(&store, "n.txt", RetentionClass::Never, t0());

    let maintenance = Maintenance::new(&store, &store);

    // Two hours in: only the one-hour file is expired.
    let later = t0() + Duration::hours(2);
    let stats = maintenance.stats(later).unwrap();
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.expiring_soon, 1);
    assert_eq!(stats.total, 3);
    assert_eq!(stats.never_expire, 1);

    let outcome = maintenance.sweep(later).unwrap();
    assert_eq!(outcome.deleted, 1);
    assert_eq!(outcome.errors, 0);

    // Two days in: the one-day file goes too.
    let much_later = t0() + Duration::days(2);
    let outcome = maintenance.sweep(much_later).unwrap();
    assert_eq!(outcome.deleted, 1);

    let stats = maintenance.stats(much_later).unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.never_expire, 1);
    assert_eq!(stats.expired, 0);
}

#[test]
fn test_sweep_is_idempotent() {
    let store = MemoryStore::new();
    upload(&store, "h.txt", RetentionClass::OneHour, t0());

    let maintenance = Maintenance::new(&store, &store);
    let later = t0() + Duration::days(1);

    assert_eq!(maintenance.sweep(later).unwrap().deleted, 1);
    let again = maintenance.sweep(later).unwrap();
    assert_eq!(again.deleted, 0);
    assert_eq!(again.errors, 0);
}

#[test]
fn test_bearer_check() {
    assert!(authorize("cleanup-secret", "cleanup-secret"));
    assert!(!authorize("cleanup-secret", "cleanup-secret "));
    assert!(!authorize("CLEANUP-SECRET", "cleanup-secret"));
}

#[test]
fn test_export_reflects_sweep() {
    let store = MemoryStore::new();
    upload(&store, "h.txt", RetentionClass::OneHour, t0());
    upload(&store, "n.txt", RetentionClass::Never, t0());

    let later = t0() + Duration::days(1);
    Maintenance::new(&store, &store).sweep(later).unwrap();

    let export = build_export(&store, &store, None, later).unwrap();
    assert_eq!(export.files.len(), 1);
    assert_eq!(export.files[0].record.file_name, "n.txt");
    assert_eq!(export.export_date, later);
}
