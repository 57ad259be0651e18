// ============================================================================
// hookstore Library
// ============================================================================

//! Versioned record persistence for the hook service.
//!
//! Records are stored tagged with the schema version they were written at and
//! upgraded through their entity's [`SchemaVersionChain`] whenever they are
//! read. A [`RetentionPruner`] caps per-group history, and the
//! [`DefinitionLoader`] validates declarative definition documents before they
//! are accepted.
//!
//! ```
//! use hookstore::{HookStoreConfig, HookStores};
//!
//! # fn main() -> hookstore::Result<()> {
//! let stores = HookStores::in_memory(&HookStoreConfig::default())?;
//! assert_eq!(stores.hooks.kind().chain().latest_version()?, 5);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod definition;
pub mod hooks;
pub mod retention;
pub mod schema;
pub mod storage;

pub use config::{HookStoreConfig, MAX_PAGE_SIZE, RetentionConfig, StoreConfig};
pub use core::{FieldSet, FieldType, Record, Result, StoreError, field_set};
pub use definition::{Definition, DefinitionError, DefinitionLoader, MethodSpec};
pub use hooks::{Hook, HookDefinition, HookQueue, HookStores, LastFire, expire_last_fires};
pub use retention::{GroupFailure, GroupKey, PruneReport, RetentionPruner, RetentionTarget};
pub use schema::{MigrateFn, SchemaVersion, SchemaVersionChain};
pub use storage::{
    Continuation, EntityKind, FieldCodec, Filter, InMemoryBackend, KeySpec, PlainTextCodec,
    Predicate, RecordBackend, RecordPage, VersionedRecordStore,
};
