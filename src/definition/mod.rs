//! Declarative definition documents.
//!
//! A definition is one numbered release of a set of named methods plus the
//! migration script that brings the backing store to that release. Documents
//! are checked structurally before they are accepted; the meaning of each
//! method field is left to whoever consumes the definition.

mod error;

pub use error::DefinitionError;

use crate::core::{Result, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{Level, event};

/// Keys a definition document must have, sorted.
pub const DEFINITION_KEYS: [&str; 3] = ["methods", "migrationScript", "version"];

/// Keys every method must have, sorted.
pub const METHOD_KEYS: [&str; 6] = [
    "args",
    "body",
    "description",
    "mode",
    "returns",
    "serviceName",
];

/// One method of a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MethodSpec {
    pub args: String,
    pub body: String,
    pub description: String,
    pub mode: String,
    pub returns: String,
    pub service_name: String,
}

impl MethodSpec {
    pub fn to_serializable(&self) -> Value {
        json!({
            "args": self.args,
            "body": self.body,
            "description": self.description,
            "mode": self.mode,
            "returns": self.returns,
            "serviceName": self.service_name,
        })
    }
}

/// A validated definition. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Definition {
    pub version: u32,
    pub migration_script: String,
    pub methods: BTreeMap<String, MethodSpec>,
}

impl Definition {
    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.get(name)
    }

    /// Plain structural form, readable back with [`from_serializable`](Self::from_serializable).
    pub fn to_serializable(&self) -> Value {
        let methods: Map<String, Value> = self
            .methods
            .iter()
            .map(|(name, method)| (name.clone(), method.to_serializable()))
            .collect();
        json!({
            "version": self.version,
            "migrationScript": self.migration_script,
            "methods": methods,
        })
    }

    /// Rebuilds a definition from its structural form, rejecting unknown top-level keys.
    pub fn from_serializable(value: &Value) -> std::result::Result<Self, DefinitionError> {
        const ORIGIN: &str = "serialized definition";

        let Some(object) = value.as_object() else {
            return Err(DefinitionError::InvalidFieldType {
                origin: ORIGIN.to_string(),
                field: "document".to_string(),
                expected: "a mapping".to_string(),
            });
        };
        if let Some(field) = object
            .keys()
            .find(|key| !DEFINITION_KEYS.contains(&key.as_str()))
        {
            return Err(DefinitionError::UnexpectedTopLevelKey {
                origin: ORIGIN.to_string(),
                field: field.clone(),
            });
        }

        serde_json::from_value(value.clone()).map_err(|err| DefinitionError::Parse {
            origin: ORIGIN.to_string(),
            message: err.to_string(),
        })
    }
}

/// Validates definition documents and turns them into [`Definition`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionLoader;

impl DefinitionLoader {
    /// Validates an already-parsed document.
    ///
    /// `origin` identifies where the document came from, typically its file
    /// name; its numeric base name must equal the document's `version`.
    pub fn load(document: &Value, origin: &str) -> std::result::Result<Definition, DefinitionError> {
        let content = check_top_level(document, origin)?;
        let version = check_version_matches_origin(content, origin)?;
        let migration_script = string_field(content, "migrationScript", origin)?;
        let methods = check_methods(content, origin)?;

        event!(
            Level::DEBUG,
            origin,
            version,
            methods = methods.len(),
            "definition loaded"
        );

        Ok(Definition {
            version,
            migration_script,
            methods,
        })
    }

    /// Parses YAML text and validates it.
    pub fn load_yaml_str(text: &str, origin: &str) -> std::result::Result<Definition, DefinitionError> {
        let document: Value = serde_yaml::from_str(text).map_err(|err| DefinitionError::Parse {
            origin: origin.to_string(),
            message: err.to_string(),
        })?;
        Self::load(&document, origin)
    }

    /// Reads and validates one YAML definition file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Definition> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            StoreError::Io(format!("Cannot read '{}': {}", path.display(), err))
        })?;
        let origin = path.display().to_string();
        Ok(Self::load_yaml_str(&text, &origin)?)
    }

    /// Loads every `*.yml` / `*.yaml` file in `dir`, sorted by version.
    ///
    /// The versions must run 1, 2, 3, ... without gaps or duplicates.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<Definition>> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "yml" || ext == "yaml");
            if is_yaml && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut loaded = Vec::with_capacity(paths.len());
        for path in &paths {
            loaded.push((Self::load_file(path)?, path.display().to_string()));
        }
        loaded.sort_by_key(|(definition, _)| definition.version);

        for (idx, (definition, origin)) in loaded.iter().enumerate() {
            let expected = idx as u32 + 1;
            if definition.version != expected {
                return Err(DefinitionError::VersionGap {
                    origin: origin.clone(),
                    expected,
                    found: definition.version,
                }
                .into());
            }
        }

        event!(
            Level::INFO,
            dir = %dir.display(),
            count = loaded.len(),
            "definitions loaded"
        );
        Ok(loaded.into_iter().map(|(definition, _)| definition).collect())
    }
}

/// Exact top-level key set, then truthiness of `version` and `migrationScript`.
fn check_top_level<'a>(
    document: &'a Value,
    origin: &str,
) -> std::result::Result<&'a Map<String, Value>, DefinitionError> {
    let Some(content) = document.as_object() else {
        return Err(DefinitionError::InvalidFieldType {
            origin: origin.to_string(),
            field: "document".to_string(),
            expected: "a mapping".to_string(),
        });
    };

    for field in ["version", "migrationScript", "methods"] {
        if !content.contains_key(field) {
            return Err(DefinitionError::MissingTopLevelKey {
                origin: origin.to_string(),
                field: field.to_string(),
            });
        }
    }
    if let Some(field) = content
        .keys()
        .find(|key| !DEFINITION_KEYS.contains(&key.as_str()))
    {
        return Err(DefinitionError::UnexpectedTopLevelKey {
            origin: origin.to_string(),
            field: field.clone(),
        });
    }

    for field in ["version", "migrationScript"] {
        if !is_truthy(&content[field]) {
            return Err(DefinitionError::EmptyField {
                origin: origin.to_string(),
                field: field.to_string(),
            });
        }
    }

    Ok(content)
}

fn check_version_matches_origin(
    content: &Map<String, Value>,
    origin: &str,
) -> std::result::Result<u32, DefinitionError> {
    let version = content["version"]
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| DefinitionError::InvalidFieldType {
            origin: origin.to_string(),
            field: "version".to_string(),
            expected: "a positive integer".to_string(),
        })?;

    let token = version_token(origin);
    if token.parse::<u64>().ok() != Some(u64::from(version)) {
        return Err(DefinitionError::VersionMismatch {
            origin: origin.to_string(),
            version: u64::from(version),
            token,
        });
    }
    Ok(version)
}

/// Base name of `origin` with its extension stripped, e.g. `db/versions/0004.yml` -> `0004`.
fn version_token(origin: &str) -> String {
    Path::new(origin)
        .file_stem()
        .map(|stem| stem.to_string_lossy().trim().to_string())
        .unwrap_or_default()
}

fn check_methods(
    content: &Map<String, Value>,
    origin: &str,
) -> std::result::Result<BTreeMap<String, MethodSpec>, DefinitionError> {
    let Some(methods) = content["methods"].as_object() else {
        return Err(DefinitionError::InvalidFieldType {
            origin: origin.to_string(),
            field: "methods".to_string(),
            expected: "a mapping of method name to method".to_string(),
        });
    };

    if let Some(method) = methods.keys().find(|name| name.chars().any(char::is_uppercase)) {
        return Err(DefinitionError::UppercaseMethodName {
            origin: origin.to_string(),
            method: method.clone(),
        });
    }

    let expected: BTreeSet<&str> = METHOD_KEYS.into_iter().collect();
    let mut parsed = BTreeMap::new();
    for (name, method) in methods {
        let Some(method) = method.as_object() else {
            return Err(DefinitionError::InvalidFieldType {
                origin: origin.to_string(),
                field: format!("methods.{}", name),
                expected: "a mapping".to_string(),
            });
        };

        let actual: BTreeSet<&str> = method.keys().map(String::as_str).collect();
        if actual != expected {
            return Err(DefinitionError::MethodKeyMismatch {
                origin: origin.to_string(),
                method: name.clone(),
                missing: expected.difference(&actual).map(|k| k.to_string()).collect(),
                unexpected: actual.difference(&expected).map(|k| k.to_string()).collect(),
            });
        }

        let field = |key: &str| {
            method[key]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| DefinitionError::InvalidFieldType {
                    origin: origin.to_string(),
                    field: format!("methods.{}.{}", name, key),
                    expected: "a string".to_string(),
                })
        };
        parsed.insert(
            name.clone(),
            MethodSpec {
                args: field("args")?,
                body: field("body")?,
                description: field("description")?,
                mode: field("mode")?,
                returns: field("returns")?,
                service_name: field("serviceName")?,
            },
        );
    }

    Ok(parsed)
}

fn string_field(
    content: &Map<String, Value>,
    field: &str,
    origin: &str,
) -> std::result::Result<String, DefinitionError> {
    content[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DefinitionError::InvalidFieldType {
            origin: origin.to_string(),
            field: field.to_string(),
            expected: "a string".to_string(),
        })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
