pub mod error;
pub mod record;
pub mod types;

pub use error::{Result, StoreError};
pub use record::{Record, entity_fields, json_type_name};
pub use types::{FieldSet, FieldType, field_set, format_date, parse_date};
