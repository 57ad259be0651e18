use crate::core::{Record, Result, StoreError, json_type_name};
use crate::schema::SchemaVersionChain;
use serde_json::{Map, Value};
use std::sync::Arc;

const KEY_SEPARATOR: char = '~';

/// Which fields make up a key. More than one field forms a composite key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    fields: Vec<String>,
}

impl KeySpec {
    pub fn single(field: impl Into<String>) -> Self {
        Self {
            fields: vec![field.into()],
        }
    }

    pub fn composite<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Renders the key from a record's fields.
    ///
    /// Composite components are escaped and joined with `~`, so distinct
    /// component tuples never render to the same key.
    pub fn render(&self, entity: &str, fields: &Map<String, Value>) -> Result<String> {
        let mut components = Vec::with_capacity(self.fields.len());
        for name in &self.fields {
            let value = fields.get(name).ok_or_else(|| {
                StoreError::FieldValidation(format!(
                    "Key field '{}' of '{}' is missing",
                    name, entity
                ))
            })?;
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(StoreError::FieldValidation(format!(
                        "Key field '{}' of '{}' must be a string or number, got {}",
                        name,
                        entity,
                        json_type_name(other)
                    )));
                }
            };
            components.push(text);
        }

        if components.len() == 1 {
            return Ok(components.remove(0));
        }
        Ok(composite_key(components.iter().map(String::as_str)))
    }
}

/// Joins key components with `~`, escaping `%` and `~` inside each component.
pub fn composite_key<'a>(components: impl IntoIterator<Item = &'a str>) -> String {
    components
        .into_iter()
        .map(|c| c.replace('%', "%25").replace(KEY_SEPARATOR, "%7E"))
        .collect::<Vec<_>>()
        .join(&KEY_SEPARATOR.to_string())
}

/// An entity kind: table name, key layout and schema chain.
#[derive(Debug, Clone)]
pub struct EntityKind {
    name: String,
    partition_key: KeySpec,
    row_key: KeySpec,
    chain: Arc<SchemaVersionChain>,
}

impl EntityKind {
    /// Declares an entity kind. The chain must be non-empty and contiguous, and
    /// every key field must be declared by the latest version.
    pub fn new(
        name: impl Into<String>,
        partition_key: KeySpec,
        row_key: KeySpec,
        chain: SchemaVersionChain,
    ) -> Result<Self> {
        let name = name.into();
        chain.validate()?;

        let latest = chain.latest()?;
        for field in partition_key.fields().iter().chain(row_key.fields()) {
            if !latest.fields.contains_key(field) {
                return Err(StoreError::InvalidVersion(format!(
                    "Key field '{}' of '{}' is not declared in version {}",
                    field, name, latest.number
                )));
            }
        }

        Ok(Self {
            name,
            partition_key,
            row_key,
            chain: Arc::new(chain),
        })
    }

    /// Table name used in the backend.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chain(&self) -> &SchemaVersionChain {
        &self.chain
    }

    pub fn partition_key(&self) -> &KeySpec {
        &self.partition_key
    }

    pub fn row_key(&self) -> &KeySpec {
        &self.row_key
    }

    /// Builds a record whose keys are derived from its fields.
    pub fn record(&self, fields: Map<String, Value>) -> Result<Record> {
        let partition_key = self.partition_key.render(&self.name, &fields)?;
        let row_key = self.row_key.render(&self.name, &fields)?;
        Ok(Record::new(partition_key, row_key, fields))
    }
}
