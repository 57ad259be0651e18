use crate::core::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record as the backend holds it: encrypted fields still encoded, version as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub partition_key: String,
    pub row_key: String,
    pub version: u32,
    pub fields: Map<String, Value>,
}

impl StoredRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.partition_key.clone(), self.row_key.clone())
    }
}

/// Partition key + row key. Orders by partition first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordKey {
    pub partition_key: String,
    pub row_key: String,
}

impl RecordKey {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
        }
    }
}

/// Resume point of a paged scan: the last key already returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continuation {
    pub after: RecordKey,
}

/// One page of raw records plus where to resume, if anything remains.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub records: Vec<StoredRecord>,
    pub continuation: Option<Continuation>,
}

/// Storage backend trait - allows pluggable storage backends
///
/// Backends store opaque records scoped by table name. They know nothing about
/// schema versions or field encoding; `VersionedRecordStore` layers those on top.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Insert or replace a record.
    async fn put(&self, table: &str, record: StoredRecord) -> Result<()>;

    /// Insert a record, failing with `RecordExists` if the key is taken.
    async fn insert(&self, table: &str, record: StoredRecord) -> Result<()>;

    /// Replace a record only if the stored copy is still at `expected_version`.
    ///
    /// Returns false (and writes nothing) if the record is gone or its version moved.
    async fn replace_if_version(
        &self,
        table: &str,
        record: StoredRecord,
        expected_version: u32,
    ) -> Result<bool>;

    /// Fetch a record by key.
    async fn get(&self, table: &str, partition_key: &str, row_key: &str)
    -> Result<Option<StoredRecord>>;

    /// Return up to `limit` records in key order, starting after `continuation`.
    async fn scan_page(
        &self,
        table: &str,
        continuation: Option<&Continuation>,
        limit: usize,
    ) -> Result<ScanPage>;

    /// Delete a record. Returns whether anything was removed; a missing key is not an error.
    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> Result<bool>;
}
