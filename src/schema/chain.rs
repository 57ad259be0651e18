use super::*;

/// Ordered, gap-free list of schema versions for one entity kind.
///
/// Built once at startup and shared read-only (usually behind an `Arc`).
#[derive(Debug, Clone)]
pub struct SchemaVersionChain {
    entity: String,
    versions: Vec<SchemaVersion>,
}

// Keep definition and upgrade logic split by concern; both share this module scope.
include!("chain/define_and_validate.rs");
include!("chain/upgrade.rs");
