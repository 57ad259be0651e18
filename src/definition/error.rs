use thiserror::Error;

/// Why a definition document was rejected.
///
/// Every variant names the source it came from so the offending file can be found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("{field} field missing in {origin}")]
    MissingTopLevelKey { origin: String, field: String },

    #[error("unknown field {field} in {origin}")]
    UnexpectedTopLevelKey { origin: String, field: String },

    #[error("{field} field is empty in {origin}")]
    EmptyField { origin: String, field: String },

    #[error("{field} in {origin} must be {expected}")]
    InvalidFieldType {
        origin: String,
        field: String,
        expected: String,
    },

    #[error("filename {origin} must match version {version} (found token '{token}')")]
    VersionMismatch {
        origin: String,
        version: u64,
        token: String,
    },

    #[error("db function method {method} in {origin} has capital letters")]
    UppercaseMethodName { origin: String, method: String },

    #[error(
        "unexpected or missing properties in method {method} in {origin} (missing: {missing:?}, unexpected: {unexpected:?})"
    )]
    MethodKeyMismatch {
        origin: String,
        method: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("definition versions must be contiguous: expected version {expected}, found {found} ({origin})")]
    VersionGap {
        origin: String,
        expected: u32,
        found: u32,
    },

    #[error("cannot parse {origin}: {message}")]
    Parse { origin: String, message: String },
}
