use super::engine::{Continuation, RecordKey, ScanPage, StoredRecord};
use crate::core::{Result, StoreError};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Records of one table, ordered by key.
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    name: String,
    rows: BTreeMap<RecordKey, StoredRecord>,
}

impl RecordTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn put(&mut self, record: StoredRecord) {
        self.rows.insert(record.key(), record);
    }

    pub fn insert(&mut self, record: StoredRecord) -> Result<()> {
        let key = record.key();
        if self.rows.contains_key(&key) {
            return Err(StoreError::RecordExists {
                table: self.name.clone(),
                partition_key: key.partition_key,
                row_key: key.row_key,
            });
        }
        self.rows.insert(key, record);
        Ok(())
    }

    pub fn replace_if_version(&mut self, record: StoredRecord, expected_version: u32) -> bool {
        match self.rows.get_mut(&record.key()) {
            Some(existing) if existing.version == expected_version => {
                *existing = record;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, key: &RecordKey) -> Option<&StoredRecord> {
        self.rows.get(key)
    }

    pub fn delete(&mut self, key: &RecordKey) -> bool {
        self.rows.remove(key).is_some()
    }

    /// Returns up to `limit` rows after `continuation` in key order.
    pub fn scan_page(&self, continuation: Option<&Continuation>, limit: usize) -> ScanPage {
        let lower = match continuation {
            Some(c) => Bound::Excluded(c.after.clone()),
            None => Bound::Unbounded,
        };

        let mut iter = self.rows.range((lower, Bound::Unbounded));
        let records: Vec<StoredRecord> = iter.by_ref().take(limit).map(|(_, r)| r.clone()).collect();
        let has_more = iter.next().is_some();

        let continuation = if has_more {
            records.last().map(|last| Continuation { after: last.key() })
        } else {
            None
        };

        ScanPage {
            records,
            continuation,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
