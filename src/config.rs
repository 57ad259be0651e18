//! Runtime configuration for stores and retention passes.

use crate::core::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest page a scan may request from a backend.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Behaviour of a `VersionedRecordStore`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Records fetched from the backend per scan page.
    pub page_size: usize,
    /// Persist the upgraded form of a record when `get` had to migrate it.
    pub write_back_on_read: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            write_back_on_read: true,
        }
    }
}

impl StoreConfig {
    /// Set the scan page size
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Enable or disable write-back of upgraded records
    pub fn write_back_on_read(mut self, enabled: bool) -> Self {
        self.write_back_on_read = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_page_size("store.page_size", self.page_size)
    }
}

/// Parameters of a retention pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Records kept per group.
    pub keep: usize,
    /// Page size used while collecting a group's candidates.
    pub page_size: usize,
    /// Groups pruned at the same time.
    pub max_concurrent_groups: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            keep: 100,
            page_size: 500,
            max_concurrent_groups: 1,
        }
    }
}

impl RetentionConfig {
    /// Set how many records survive per group
    pub fn keep(mut self, keep: usize) -> Self {
        self.keep = keep;
        self
    }

    /// Set the candidate scan page size
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set how many groups are pruned concurrently
    pub fn max_concurrent_groups(mut self, max: usize) -> Self {
        self.max_concurrent_groups = max;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_page_size("retention.page_size", self.page_size)?;
        if self.max_concurrent_groups == 0 {
            return Err(StoreError::Config(
                "retention.max_concurrent_groups must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration file.
///
/// ```yaml
/// store:
///   page_size: 1000
///   write_back_on_read: true
/// retention:
///   keep: 100
///   page_size: 500
///   max_concurrent_groups: 4
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookStoreConfig {
    pub store: StoreConfig,
    pub retention: RetentionConfig,
}

impl HookStoreConfig {
    /// Parse and validate a YAML document. Missing keys take their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)
            .map_err(|err| StoreError::Config(format!("Invalid configuration: {}", err)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            StoreError::Io(format!("Cannot read config '{}': {}", path.display(), err))
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.retention.validate()
    }
}

fn validate_page_size(name: &str, page_size: usize) -> Result<()> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(StoreError::Config(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_PAGE_SIZE, page_size
        )));
    }
    Ok(())
}
