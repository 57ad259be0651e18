//! Versioned schema chains.
//!
//! A chain is the ordered list of shapes an entity kind has had. Each version
//! after the first may carry a migrate step that rewrites a record stored at the
//! previous version. Reading a record walks the chain one step at a time until
//! the record reaches the latest version.

use crate::core::{FieldSet, Record, Result, StoreError, json_type_name};
use std::sync::Arc;
use tracing::{Level, event};

mod chain;

pub use chain::SchemaVersionChain;

/// A pure transform from the previous version's stored shape to this version's.
pub type MigrateFn = Arc<dyn Fn(Record) -> Result<Record> + Send + Sync>;

/// One version of an entity's stored shape.
#[derive(Clone)]
pub struct SchemaVersion {
    pub number: u32,
    pub fields: FieldSet,
    pub(crate) migrate: Option<MigrateFn>,
}

impl SchemaVersion {
    /// Creates a version with no migrate step.
    pub fn new(number: u32, fields: FieldSet) -> Self {
        Self {
            number,
            fields,
            migrate: None,
        }
    }

    /// Attaches the migrate step applied to records coming from `number - 1`.
    pub fn with_migrate<F>(mut self, migrate: F) -> Self
    where
        F: Fn(Record) -> Result<Record> + Send + Sync + 'static,
    {
        self.migrate = Some(Arc::new(migrate));
        self
    }

    pub fn has_migrate(&self) -> bool {
        self.migrate.is_some()
    }
}

impl std::fmt::Debug for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaVersion")
            .field("number", &self.number)
            .field("fields", &self.fields)
            .field("has_migrate", &self.migrate.is_some())
            .finish()
    }
}
