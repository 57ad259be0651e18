use super::codec::{FieldCodec, PlainTextCodec};
use super::engine::{Continuation, RecordBackend, StoredRecord};
use super::filter::Filter;
use super::kind::EntityKind;
use crate::config::{MAX_PAGE_SIZE, StoreConfig};
use crate::core::{Record, Result, StoreError, entity_fields, json_type_name};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::sync::Arc;
use tracing::{Level, event};

/// Matching records of one scan page, already upgraded to the latest version.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<Record>,
    /// Where the next page starts; `None` once the table is exhausted.
    pub continuation: Option<Continuation>,
}

/// Keyed store for one entity kind.
///
/// Writes tag records with the latest schema version. Reads decode encrypted
/// fields and run the schema chain over anything stored at an older version,
/// so callers only ever see the latest shape.
#[derive(Clone)]
pub struct VersionedRecordStore {
    kind: Arc<EntityKind>,
    backend: Arc<dyn RecordBackend>,
    codec: Arc<dyn FieldCodec>,
    config: StoreConfig,
}

impl VersionedRecordStore {
    pub fn new(kind: EntityKind, backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            kind: Arc::new(kind),
            backend,
            codec: Arc::new(PlainTextCodec),
            config: StoreConfig::default(),
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn FieldCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_config(mut self, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn table(&self) -> &str {
        self.kind.name()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Inserts or replaces a record, tagged with the latest schema version.
    ///
    /// A record carrying an older, non-zero version is upgraded first. The
    /// fields must satisfy the latest field set.
    pub async fn put(&self, record: Record) -> Result<Record> {
        let (record, stored) = self.prepare_write(record)?;
        self.backend.put(self.table(), stored).await?;
        Ok(record)
    }

    /// Like [`put`](Self::put), but fails with `RecordExists` if the key is taken.
    pub async fn create(&self, record: Record) -> Result<Record> {
        let (record, stored) = self.prepare_write(record)?;
        self.backend.insert(self.table(), stored).await?;
        Ok(record)
    }

    /// Serializes an entity, derives its keys and stores it.
    pub async fn put_entity<T: Serialize>(&self, entity: &T) -> Result<Record> {
        let record = self.kind.record(entity_fields(entity)?)?;
        self.put(record).await
    }

    /// Serializes an entity, derives its keys and creates it.
    pub async fn create_entity<T: Serialize>(&self, entity: &T) -> Result<Record> {
        let record = self.kind.record(entity_fields(entity)?)?;
        self.create(record).await
    }

    /// Reads a record, upgraded to the latest version.
    pub async fn get(&self, partition_key: &str, row_key: &str) -> Result<Record> {
        self.load(partition_key, row_key)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                table: self.table().to_string(),
                partition_key: partition_key.to_string(),
                row_key: row_key.to_string(),
            })
    }

    /// Reads a record, returning `None` if it does not exist.
    ///
    /// With `write_back_on_read`, an upgraded record replaces the stored copy,
    /// but only if that copy is still at the version that was read; a
    /// concurrent writer always wins.
    pub async fn load(&self, partition_key: &str, row_key: &str) -> Result<Option<Record>> {
        let Some(stored) = self.backend.get(self.table(), partition_key, row_key).await? else {
            return Ok(None);
        };

        let stored_version = stored.version;
        let record = self.materialize(stored)?;

        if record.version != stored_version && self.config.write_back_on_read {
            let encoded = self.encode(&record)?;
            let written = self
                .backend
                .replace_if_version(self.table(), encoded, stored_version)
                .await?;
            event!(
                Level::DEBUG,
                table = %self.table(),
                partition_key,
                row_key,
                from_version = stored_version,
                to_version = record.version,
                written,
                "upgraded record write-back"
            );
        }

        Ok(Some(record))
    }

    /// Reads a record and deserializes it into a typed entity.
    pub async fn get_entity<T: DeserializeOwned>(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<T> {
        self.get(partition_key, row_key).await?.to_entity()
    }

    /// Reads a record, applies `change`, and writes it back.
    ///
    /// `change` must not alter the record's keys.
    pub async fn modify<F>(&self, partition_key: &str, row_key: &str, change: F) -> Result<Record>
    where
        F: FnOnce(&mut Record) -> Result<()>,
    {
        let mut record = self.get(partition_key, row_key).await?;
        change(&mut record)?;
        if record.partition_key != partition_key || record.row_key != row_key {
            return Err(StoreError::FieldValidation(format!(
                "modify cannot move '{}/{}' in '{}' to a new key",
                partition_key,
                row_key,
                self.table()
            )));
        }
        self.put(record).await
    }

    /// Fetches one page using the configured page size.
    pub async fn scan_page(
        &self,
        filter: &Filter,
        continuation: Option<&Continuation>,
    ) -> Result<RecordPage> {
        self.scan_page_with_limit(filter, continuation, self.config.page_size)
            .await
    }

    /// Fetches one backend page of at most `limit` records and keeps those matching `filter`.
    ///
    /// A page may hold fewer matches than `limit`, or none, while a
    /// continuation is still returned.
    pub async fn scan_page_with_limit(
        &self,
        filter: &Filter,
        continuation: Option<&Continuation>,
        limit: usize,
    ) -> Result<RecordPage> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let page = self
            .backend
            .scan_page(self.table(), continuation, limit)
            .await?;

        let mut records = Vec::new();
        for stored in page.records {
            let record = self.materialize(stored)?;
            if filter.matches(&record.fields) {
                records.push(record);
            }
        }

        Ok(RecordPage {
            records,
            continuation: page.continuation,
        })
    }

    /// Visits every matching record once, page by page. Returns how many were visited.
    ///
    /// Each call starts from the beginning of the table. An error from `visit`
    /// stops the scan and is returned as-is.
    pub async fn scan<F>(&self, filter: &Filter, visit: F) -> Result<usize>
    where
        F: FnMut(Record) -> Result<()> + Send,
    {
        self.scan_with_page_size(filter, self.config.page_size, visit)
            .await
    }

    pub async fn scan_with_page_size<F>(
        &self,
        filter: &Filter,
        page_size: usize,
        mut visit: F,
    ) -> Result<usize>
    where
        F: FnMut(Record) -> Result<()> + Send,
    {
        let mut continuation: Option<Continuation> = None;
        let mut visited = 0usize;

        loop {
            let page = self
                .scan_page_with_limit(filter, continuation.as_ref(), page_size)
                .await?;
            for record in page.records {
                visit(record)?;
                visited += 1;
            }
            match page.continuation {
                Some(next) => continuation = Some(next),
                None => break,
            }
        }

        Ok(visited)
    }

    /// Deletes a record. Returns whether it existed; removing a missing record is not an error.
    pub async fn remove(&self, partition_key: &str, row_key: &str) -> Result<bool> {
        let removed = self
            .backend
            .delete(self.table(), partition_key, row_key)
            .await?;
        if !removed {
            event!(
                Level::TRACE,
                table = %self.table(),
                partition_key,
                row_key,
                "remove of missing record ignored"
            );
        }
        Ok(removed)
    }

    fn prepare_write(&self, mut record: Record) -> Result<(Record, StoredRecord)> {
        let chain = self.kind.chain();
        let latest = chain.latest_version()?;

        if record.version != 0 && record.version < latest {
            record = chain.upgrade(record)?;
        } else if record.version > latest {
            return Err(StoreError::FutureVersion {
                entity: chain.entity().to_string(),
                found: record.version,
                latest,
            });
        }
        record.version = latest;

        chain.validate_fields(&record)?;
        let stored = self.encode(&record)?;
        Ok((record, stored))
    }

    fn materialize(&self, stored: StoredRecord) -> Result<Record> {
        let record = self.decode(stored)?;
        self.kind.chain().upgrade(record)
    }

    fn encode(&self, record: &Record) -> Result<StoredRecord> {
        let mut fields = record.fields.clone();
        self.transcode(record.version, &mut fields, |field, text| {
            self.codec.encode(field, text)
        })?;
        Ok(StoredRecord {
            partition_key: record.partition_key.clone(),
            row_key: record.row_key.clone(),
            version: record.version,
            fields,
        })
    }

    fn decode(&self, stored: StoredRecord) -> Result<Record> {
        let StoredRecord {
            partition_key,
            row_key,
            version,
            mut fields,
        } = stored;
        self.transcode(version, &mut fields, |field, text| {
            self.codec.decode(field, text)
        })?;
        Ok(Record {
            partition_key,
            row_key,
            version,
            fields,
        })
    }

    /// Runs `apply` over every `EncryptedText` field declared by `version`.
    ///
    /// Versions the chain does not know are left untouched; the upgrade step
    /// reports them.
    fn transcode<F>(
        &self,
        version: u32,
        fields: &mut serde_json::Map<String, Value>,
        apply: F,
    ) -> Result<()>
    where
        F: Fn(&str, &str) -> Result<String>,
    {
        let Some(schema) = self.kind.chain().version(version) else {
            return Ok(());
        };

        for (name, field_type) in &schema.fields {
            if !field_type.is_encrypted() {
                continue;
            }
            let Some(value) = fields.get_mut(name) else {
                continue;
            };
            let Value::String(text) = value else {
                return Err(StoreError::Codec(format!(
                    "Encrypted field '{}' of '{}' must be text, got {}",
                    name,
                    self.table(),
                    json_type_name(value)
                )));
            };
            *text = apply(name, text)?;
        }
        Ok(())
    }
}
