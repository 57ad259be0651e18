pub mod codec;
pub mod engine;
pub mod filter;
pub mod kind;
pub mod memory;
pub mod store;
pub mod table;

pub use codec::{FieldCodec, PlainTextCodec};
pub use engine::{Continuation, RecordBackend, RecordKey, ScanPage, StoredRecord};
pub use filter::{Filter, Predicate, compare_values};
pub use kind::{EntityKind, KeySpec, composite_key};
pub use memory::InMemoryBackend;
pub use store::{RecordPage, VersionedRecordStore};
pub use table::RecordTable;
