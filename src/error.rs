//! Error taxonomy for the import engine.
//!
//! Each variant is scoped to one unit of work. None of them aborts a batch:
//! the batch loops log the error, count it, and move on.

use thiserror::Error;

/// Errors that fail a single imported resource.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The resource does not fit the typed model (wrong JSON shape).
    #[error("malformed {resource_type} resource: {source}")]
    MalformedInput {
        resource_type: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A field the relational mapping cannot do without is absent.
    #[error("{resource_type} resource is missing required field `{field}`")]
    MissingField {
        resource_type: &'static str,
        field: &'static str,
    },

    /// A uniqueness constraint rejected the row; the entity already exists.
    #[error("duplicate {entity}: {key}")]
    DuplicateEntity { entity: &'static str, key: String },

    /// Any insert/select/update or transaction failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl ImportError {
    /// Wraps a deserialization failure for the given resource type.
    pub fn malformed(resource_type: &'static str, source: serde_json::Error) -> Self {
        Self::MalformedInput {
            resource_type,
            source,
        }
    }
}

/// Inline attachment data that could not be turned into text.
#[derive(Debug, Error)]
pub enum DecodeFailure {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decoded content is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
