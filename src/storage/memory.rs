use super::engine::{Continuation, RecordBackend, RecordKey, ScanPage, StoredRecord};
use super::table::RecordTable;
use crate::core::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process backend. Tables are created on first write.
pub struct InMemoryBackend {
    /// Each table has its own lock
    tables: RwLock<HashMap<String, Arc<RwLock<RecordTable>>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Get a handle to an existing table
    async fn get_table(&self, name: &str) -> Option<Arc<RwLock<RecordTable>>> {
        self.tables.read().await.get(name).cloned()
    }

    /// Get a handle to a table, creating it if needed
    async fn table_for_write(&self, name: &str) -> Arc<RwLock<RecordTable>> {
        if let Some(table) = self.get_table(name).await {
            return table;
        }
        let mut tables = self.tables.write().await;
        tables
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(RecordTable::new(name))))
            .clone()
    }

    /// List table names
    pub async fn list_tables(&self) -> Vec<String> {
        self.tables.read().await.keys().cloned().collect()
    }

    /// Number of records in a table (0 for unknown tables)
    pub async fn row_count(&self, table: &str) -> usize {
        match self.get_table(table).await {
            Some(handle) => handle.read().await.row_count(),
            None => 0,
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordBackend for InMemoryBackend {
    async fn put(&self, table: &str, record: StoredRecord) -> Result<()> {
        let handle = self.table_for_write(table).await;
        handle.write().await.put(record);
        Ok(())
    }

    async fn insert(&self, table: &str, record: StoredRecord) -> Result<()> {
        let handle = self.table_for_write(table).await;
        let mut guard = handle.write().await;
        guard.insert(record)
    }

    async fn replace_if_version(
        &self,
        table: &str,
        record: StoredRecord,
        expected_version: u32,
    ) -> Result<bool> {
        let Some(handle) = self.get_table(table).await else {
            return Ok(false);
        };
        let mut guard = handle.write().await;
        Ok(guard.replace_if_version(record, expected_version))
    }

    async fn get(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<StoredRecord>> {
        let Some(handle) = self.get_table(table).await else {
            return Ok(None);
        };
        let guard = handle.read().await;
        Ok(guard.get(&RecordKey::new(partition_key, row_key)).cloned())
    }

    async fn scan_page(
        &self,
        table: &str,
        continuation: Option<&Continuation>,
        limit: usize,
    ) -> Result<ScanPage> {
        let Some(handle) = self.get_table(table).await else {
            return Ok(ScanPage::default());
        };
        let guard = handle.read().await;
        Ok(guard.scan_page(continuation, limit))
    }

    async fn delete(&self, table: &str, partition_key: &str, row_key: &str) -> Result<bool> {
        let Some(handle) = self.get_table(table).await else {
            return Ok(false);
        };
        let mut guard = handle.write().await;
        Ok(guard.delete(&RecordKey::new(partition_key, row_key)))
    }
}
