impl SchemaVersionChain {
    /// Creates an empty chain for an entity kind.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            versions: Vec::new(),
        }
    }

    /// Builds a chain from versions listed oldest first.
    pub fn from_versions<I>(entity: impl Into<String>, versions: I) -> Result<Self>
    where
        I: IntoIterator<Item = SchemaVersion>,
    {
        let mut chain = Self::new(entity);
        for version in versions {
            chain.push_version(version)?;
        }
        Ok(chain)
    }

    /// Returns the entity kind this chain describes.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Returns the defined versions, oldest first.
    pub fn versions(&self) -> &[SchemaVersion] {
        &self.versions
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Appends a version described by its parts.
    pub fn define_version(
        &mut self,
        number: u32,
        fields: FieldSet,
        migrate: Option<MigrateFn>,
    ) -> Result<()> {
        self.push_version(SchemaVersion {
            number,
            fields,
            migrate,
        })
    }

    /// Appends a version.
    ///
    /// `version.number` must be exactly one past the last defined version
    /// (1 for an empty chain). The first version has nothing to migrate from,
    /// so it cannot carry a migrate step.
    pub fn push_version(&mut self, version: SchemaVersion) -> Result<()> {
        let expected = self.next_version_number();
        if version.number != expected {
            return Err(StoreError::ChainGap {
                entity: self.entity.clone(),
                expected,
                found: version.number,
            });
        }
        if version.number == 1 && version.migrate.is_some() {
            return Err(StoreError::InvalidVersion(format!(
                "Version 1 of '{}' cannot declare a migrate step",
                self.entity
            )));
        }

        self.versions.push(version);
        Ok(())
    }

    /// Fluent form of [`push_version`](Self::push_version).
    pub fn with_version(mut self, version: SchemaVersion) -> Result<Self> {
        self.push_version(version)?;
        Ok(self)
    }

    fn next_version_number(&self) -> u32 {
        self.versions.last().map_or(1, |v| v.number + 1)
    }

    /// Returns the latest version number.
    pub fn latest_version(&self) -> Result<u32> {
        self.latest().map(|v| v.number)
    }

    /// Returns the latest version.
    pub fn latest(&self) -> Result<&SchemaVersion> {
        self.versions
            .last()
            .ok_or_else(|| StoreError::NoVersionsDefined(self.entity.clone()))
    }

    /// Looks up a version by number.
    pub fn version(&self, number: u32) -> Option<&SchemaVersion> {
        if number == 0 {
            return None;
        }
        self.versions.get(number as usize - 1)
    }

    /// Checks the chain is non-empty and contiguous from 1.
    ///
    /// `push_version` already enforces this; the check exists for chains that
    /// are handed across API boundaries and must be rejected at startup.
    pub fn validate(&self) -> Result<()> {
        if self.versions.is_empty() {
            return Err(StoreError::NoVersionsDefined(self.entity.clone()));
        }
        for (idx, version) in self.versions.iter().enumerate() {
            let expected = idx as u32 + 1;
            if version.number != expected {
                return Err(StoreError::ChainGap {
                    entity: self.entity.clone(),
                    expected,
                    found: version.number,
                });
            }
        }
        Ok(())
    }

    /// Checks a record's fields against the latest field set.
    pub fn validate_fields(&self, record: &Record) -> Result<()> {
        let latest = self.latest()?;
        self.validate_fields_against(record, latest)
    }

    fn validate_fields_against(&self, record: &Record, version: &SchemaVersion) -> Result<()> {
        for name in record.fields.keys() {
            if !version.fields.contains_key(name) {
                return Err(StoreError::FieldValidation(format!(
                    "Field '{}' is not declared in version {} of '{}'",
                    name, version.number, self.entity
                )));
            }
        }

        for (name, field_type) in &version.fields {
            let Some(value) = record.fields.get(name) else {
                return Err(StoreError::FieldValidation(format!(
                    "Field '{}' is required by version {} of '{}'",
                    name, version.number, self.entity
                )));
            };
            if !field_type.is_compatible(value) {
                return Err(StoreError::FieldValidation(format!(
                    "Field '{}' of '{}' expects type {}, got {}",
                    name,
                    self.entity,
                    field_type,
                    json_type_name(value)
                )));
            }
        }

        Ok(())
    }
}
