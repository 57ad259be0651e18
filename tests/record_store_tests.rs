use async_trait::async_trait;
use hookstore::storage::{RecordKey, ScanPage, StoredRecord};
use hookstore::{
    Continuation, EntityKind, FieldType, Filter, InMemoryBackend, KeySpec, RecordBackend,
    Result, SchemaVersion, SchemaVersionChain, StoreConfig, StoreError, VersionedRecordStore,
    field_set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Reading {
    sensor_id: String,
    reading_id: String,
    value: i64,
    taken_at: String,
}

fn reading_kind() -> EntityKind {
    let chain = SchemaVersionChain::from_versions(
        "readings",
        [
            SchemaVersion::new(
                1,
                field_set([
                    ("sensorId", FieldType::String),
                    ("readingId", FieldType::String),
                    ("value", FieldType::Integer),
                ]),
            ),
            SchemaVersion::new(
                2,
                field_set([
                    ("sensorId", FieldType::String),
                    ("readingId", FieldType::String),
                    ("value", FieldType::Integer),
                    ("takenAt", FieldType::Date),
                ]),
            )
            .with_migrate(|mut record| {
                record.set_field("takenAt", json!("1970-01-01T00:00:00.000Z"));
                Ok(record)
            }),
        ],
    )
    .unwrap();
    EntityKind::new(
        "readings",
        KeySpec::single("sensorId"),
        KeySpec::single("readingId"),
        chain,
    )
    .unwrap()
}

fn reading(sensor: &str, id: usize, value: i64) -> Reading {
    Reading {
        sensor_id: sensor.to_string(),
        reading_id: format!("r{:04}", id),
        value,
        taken_at: format!("2024-03-01T10:{:02}:00.000Z", id % 60),
    }
}

fn store_on(backend: Arc<dyn RecordBackend>) -> VersionedRecordStore {
    VersionedRecordStore::new(reading_kind(), backend)
}

#[tokio::test]
async fn test_put_then_get() {
    let store = store_on(Arc::new(InMemoryBackend::new()));
    let written = store.put_entity(&reading("s1", 1, 42)).await.unwrap();
    assert_eq!(written.version, 2);
    assert_eq!(written.partition_key, "s1");
    assert_eq!(written.row_key, "r0001");

    let read: Reading = store.get_entity("s1", "r0001").await.unwrap();
    assert_eq!(read, reading("s1", 1, 42));
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let store = store_on(Arc::new(InMemoryBackend::new()));
    let err = store.get("s1", "nope").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    assert!(store.load("s1", "nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_put_rejects_invalid_fields() {
    let store = store_on(Arc::new(InMemoryBackend::new()));
    let kind = reading_kind();

    let record = kind
        .record(
            json!({"sensorId": "s1", "readingId": "r1", "value": "high", "takenAt": "2024-03-01T10:00:00Z"})
                .as_object()
                .unwrap()
                .clone(),
        )
        .unwrap();
    let err = store.put(record).await.unwrap_err();
    assert!(matches!(err, StoreError::FieldValidation(_)));
}

#[tokio::test]
async fn test_put_upgrades_old_records_and_rejects_future_ones() {
    let store = store_on(Arc::new(InMemoryBackend::new()));
    let kind = reading_kind();
    let fields = json!({"sensorId": "s1", "readingId": "r1", "value": 1})
        .as_object()
        .unwrap()
        .clone();

    let written = store
        .put(kind.record(fields.clone()).unwrap().at_version(1))
        .await
        .unwrap();
    assert_eq!(written.version, 2);
    assert_eq!(written.field("takenAt"), Some(&json!("1970-01-01T00:00:00.000Z")));

    let err = store
        .put(kind.record(fields).unwrap().at_version(3))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::FutureVersion { found: 3, latest: 2, .. }));
}

#[tokio::test]
async fn test_create_refuses_existing_key() {
    let store = store_on(Arc::new(InMemoryBackend::new()));
    store.create_entity(&reading("s1", 1, 1)).await.unwrap();
    let err = store.create_entity(&reading("s1", 1, 2)).await.unwrap_err();
    assert!(matches!(err, StoreError::RecordExists { .. }));

    let read: Reading = store.get_entity("s1", "r0001").await.unwrap();
    assert_eq!(read.value, 1);
}

#[tokio::test]
async fn test_modify_applies_change() {
    let store = store_on(Arc::new(InMemoryBackend::new()));
    store.put_entity(&reading("s1", 1, 1)).await.unwrap();

    store
        .modify("s1", "r0001", |record| {
            record.set_field("value", json!(99));
            Ok(())
        })
        .await
        .unwrap();
    let read: Reading = store.get_entity("s1", "r0001").await.unwrap();
    assert_eq!(read.value, 99);

    let err = store
        .modify("s1", "r0001", |record| {
            record.row_key = "elsewhere".to_string();
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::FieldValidation(_)));
}

#[tokio::test]
async fn test_remove_missing_is_ok() {
    let store = store_on(Arc::new(InMemoryBackend::new()));
    store.put_entity(&reading("s1", 1, 1)).await.unwrap();

    assert!(store.remove("s1", "r0001").await.unwrap());
    assert!(!store.remove("s1", "r0001").await.unwrap());
    assert!(!store.remove("nobody", "nothing").await.unwrap());
}

#[tokio::test]
async fn test_scan_visits_every_record_once_across_pages() {
    let store = store_on(Arc::new(InMemoryBackend::new()))
        .with_config(StoreConfig::default().page_size(7))
        .unwrap();
    for id in 0..50 {
        store
            .put_entity(&reading(if id % 2 == 0 { "even" } else { "odd" }, id, id as i64))
            .await
            .unwrap();
    }

    let mut seen = HashSet::new();
    let visited = store
        .scan(&Filter::new(), |record| {
            assert!(seen.insert((record.partition_key, record.row_key)));
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(visited, 50);
    assert_eq!(seen.len(), 50);
}

#[tokio::test]
async fn test_scan_filters_after_upgrade() {
    let backend = Arc::new(InMemoryBackend::new());
    // stored at v1, so takenAt only exists after upgrade
    for (id, value) in [(1, 5), (2, 15), (3, 25)] {
        backend
            .put(
                "readings",
                StoredRecord {
                    partition_key: "s1".into(),
                    row_key: format!("r{}", id),
                    version: 1,
                    fields: json!({"sensorId": "s1", "readingId": format!("r{}", id), "value": value})
                        .as_object()
                        .unwrap()
                        .clone(),
                },
            )
            .await
            .unwrap();
    }
    let store = store_on(backend);

    let mut values = Vec::new();
    store
        .scan(
            &Filter::new()
                .gt("value", 10)
                .eq("takenAt", "1970-01-01T00:00:00.000Z"),
            |record| {
                values.push(record.field("value").cloned().unwrap());
                Ok(())
            },
        )
        .await
        .unwrap();
    assert_eq!(values, vec![json!(15), json!(25)]);
}

#[tokio::test]
async fn test_scan_page_continuation() {
    let store = store_on(Arc::new(InMemoryBackend::new()));
    for id in 0..5 {
        store.put_entity(&reading("s1", id, 0)).await.unwrap();
    }

    let first = store
        .scan_page_with_limit(&Filter::new(), None, 3)
        .await
        .unwrap();
    assert_eq!(first.records.len(), 3);
    let continuation = first.continuation.clone().unwrap();
    assert_eq!(continuation.after, RecordKey::new("s1", "r0002"));

    let second = store
        .scan_page_with_limit(&Filter::new(), Some(&continuation), 3)
        .await
        .unwrap();
    assert_eq!(second.records.len(), 2);
    assert!(second.continuation.is_none());

    // restarting without a continuation begins again
    let again = store
        .scan_page_with_limit(&Filter::new(), None, 3)
        .await
        .unwrap();
    assert_eq!(again.records[0].row_key, "r0000");
}

#[tokio::test]
async fn test_date_filters_compare_chronologically() {
    let store = store_on(Arc::new(InMemoryBackend::new()));
    let mut early = reading("s1", 1, 0);
    early.taken_at = "2024-03-01T09:00:00+00:00".to_string();
    let mut late = reading("s1", 2, 0);
    // later instant, lexically smaller
    late.taken_at = "2024-03-01T08:30:00-02:00".to_string();
    store.put_entity(&early).await.unwrap();
    store.put_entity(&late).await.unwrap();

    let cutoff = chrono::DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let mut ids = Vec::new();
    store
        .scan(&Filter::new().before("takenAt", cutoff), |record| {
            ids.push(record.row_key);
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(ids, vec!["r0001".to_string()]);
}

/// Backend wrapper counting pages served.
struct CountingBackend {
    inner: InMemoryBackend,
    pages: AtomicUsize,
}

#[async_trait]
impl RecordBackend for CountingBackend {
    async fn put(&self, table: &str, record: StoredRecord) -> Result<()> {
        self.inner.put(table, record).await
    }

    async fn insert(&self, table: &str, record: StoredRecord) -> Result<()> {
        self.inner.insert(table, record).await
    }

    async fn replace_if_version(
        &self,
        table: &str,
        record: StoredRecord,
        expected_version: u32,
    ) -> Result<bool> {
        self.inner
            .replace_if_version(table, record, expected_version)
            .await
    }

    async fn get(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<StoredRecord>> {
        self.inner.get(table, partition_key, row_key).await
    }

    async fn scan_page(
        &self,
        table: &str,
        continuation: Option<&Continuation>,
        limit: usize,
    ) -> Result<ScanPage> {
        self.pages.fetch_add(1, Ordering::SeqCst);
        self.inner.scan_page(table, continuation, limit).await
    }

    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> Result<bool> {
        self.inner.delete(table, partition_key, row_key).await
    }
}

#[tokio::test]
async fn test_scan_uses_configured_page_size() {
    let backend = Arc::new(CountingBackend {
        inner: InMemoryBackend::new(),
        pages: AtomicUsize::new(0),
    });
    let store = store_on(backend.clone())
        .with_config(StoreConfig::default().page_size(10))
        .unwrap();
    for id in 0..25 {
        store.put_entity(&reading("s1", id, 0)).await.unwrap();
    }

    let visited = store.scan(&Filter::new(), |_| Ok(())).await.unwrap();
    assert_eq!(visited, 25);
    assert_eq!(backend.pages.load(Ordering::SeqCst), 3);
}

#[test]
fn test_page_size_is_bounded() {
    let store = store_on(Arc::new(InMemoryBackend::new()));
    assert!(store.clone().with_config(StoreConfig::default().page_size(0)).is_err());
    assert!(store.with_config(StoreConfig::default().page_size(1001)).is_err());
}
