use crate::definition::DefinitionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Schema chain gap in '{entity}': expected version {expected}, got {found}")]
    ChainGap {
        entity: String,
        expected: u32,
        found: u32,
    },

    #[error("No schema versions defined for '{0}'")]
    NoVersionsDefined(String),

    #[error("Record version {found} is newer than latest schema version {latest} of '{entity}'")]
    FutureVersion {
        entity: String,
        found: u32,
        latest: u32,
    },

    #[error("Invalid schema version: {0}")]
    InvalidVersion(String),

    #[error("Migration of '{entity}' to version {version} failed: {reason}")]
    MigrationFailed {
        entity: String,
        version: u32,
        reason: String,
    },

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("Record '{partition_key}/{row_key}' not found in '{table}'")]
    NotFound {
        table: String,
        partition_key: String,
        row_key: String,
    },

    #[error("Record '{partition_key}/{row_key}' already exists in '{table}'")]
    RecordExists {
        table: String,
        partition_key: String,
        row_key: String,
    },

    #[error("Field validation error: {0}")]
    FieldValidation(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for StoreError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
