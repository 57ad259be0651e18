use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Declared fields of one schema version, by name.
pub type FieldSet = BTreeMap<String, FieldType>;

/// Storage type of a single record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    String,
    /// Arbitrary JSON; the only type that accepts `null`.
    Json,
    /// Text that passes through the store's `FieldCodec` on its way to and from the backend.
    EncryptedText,
    /// RFC 3339 timestamp stored as text.
    Date,
    Integer,
}

impl FieldType {
    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Json, _) => true,
            (Self::String, Value::String(_)) => true,
            (Self::EncryptedText, Value::String(_)) => true,
            (Self::Date, Value::String(s)) => parse_date(s).is_some(),
            (Self::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            _ => false,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::EncryptedText)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "STRING"),
            Self::Json => write!(f, "JSON"),
            Self::EncryptedText => write!(f, "ENCRYPTED_TEXT"),
            Self::Date => write!(f, "DATE"),
            Self::Integer => write!(f, "INTEGER"),
        }
    }
}

/// Builds a `FieldSet` from `(name, type)` pairs.
pub fn field_set<'a>(fields: impl IntoIterator<Item = (&'a str, FieldType)>) -> FieldSet {
    fields
        .into_iter()
        .map(|(name, field_type)| (name.to_string(), field_type))
        .collect()
}

pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Canonical text form used for `Date` fields.
pub fn format_date(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
