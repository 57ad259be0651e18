use super::{FieldSet, Result, StoreError};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// A keyed entity as seen by callers of the store.
///
/// `version` is the schema version the fields currently satisfy. A record built
/// with [`Record::new`] carries version 0 until the store tags it on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub partition_key: String,
    pub row_key: String,
    pub version: u32,
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        fields: Map<String, Value>,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            version: 0,
            fields,
        }
    }

    pub fn at_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Builds a record from a JSON object value.
    pub fn from_json_fields(
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        fields: Value,
    ) -> Result<Self> {
        match fields {
            Value::Object(map) => Ok(Self::new(partition_key, row_key, map)),
            other => Err(StoreError::FieldValidation(format!(
                "Record fields must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Mutable access to a field holding a JSON object, e.g. an embedded template.
    ///
    /// Returns `None` when the field is absent or not an object.
    pub fn object_field_mut(&mut self, name: &str) -> Option<&mut Map<String, Value>> {
        self.fields.get_mut(name).and_then(Value::as_object_mut)
    }

    /// Drops every field not declared in `fields`.
    pub fn retain_declared(&mut self, fields: &FieldSet) {
        self.fields.retain(|name, _| fields.contains_key(name));
    }

    /// Deserializes the fields into a typed entity.
    pub fn to_entity<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|err| {
            StoreError::Serialization(format!(
                "Cannot decode record '{}/{}': {}",
                self.partition_key, self.row_key, err
            ))
        })
    }
}

/// Serializes a typed entity into a field map.
pub fn entity_fields<T: Serialize>(entity: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(entity)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Serialization(format!(
            "Entity must serialize to a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
