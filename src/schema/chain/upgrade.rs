impl SchemaVersionChain {
    /// Reports whether a record stored at `version` is behind the latest version.
    pub fn needs_upgrade(&self, version: u32) -> Result<bool> {
        Ok(version < self.latest_version()?)
    }

    /// Brings a record up to the latest version.
    ///
    /// Steps run one version at a time: the migrate step of `version + 1` (if
    /// any) is applied, the fields are narrowed to that version's declared set,
    /// and the version is bumped. A record already at the latest version is
    /// returned unchanged, so upgrading twice is the same as upgrading once.
    pub fn upgrade(&self, mut record: Record) -> Result<Record> {
        let latest = self.latest_version()?;

        if record.version == 0 {
            return Err(StoreError::InvalidVersion(format!(
                "Record '{}/{}' of '{}' has no schema version",
                record.partition_key, record.row_key, self.entity
            )));
        }
        if record.version > latest {
            return Err(StoreError::FutureVersion {
                entity: self.entity.clone(),
                found: record.version,
                latest,
            });
        }

        let from_version = record.version;
        while record.version < latest {
            let next = &self.versions[record.version as usize];
            if let Some(migrate) = &next.migrate {
                record = migrate(record).map_err(|err| StoreError::MigrationFailed {
                    entity: self.entity.clone(),
                    version: next.number,
                    reason: err.to_string(),
                })?;
            }
            record.retain_declared(&next.fields);
            record.version = next.number;
        }

        if from_version < latest {
            event!(
                Level::DEBUG,
                entity = %self.entity,
                from_version,
                to_version = latest,
                "record upgraded"
            );
        }
        Ok(record)
    }
}
