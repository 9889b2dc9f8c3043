//! Error types for the repository layer

use arbiter_core::types::SchemaError;
use thiserror::Error;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors that can occur during repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Entity missing, or owned by another organization
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Write refused by the current state of the entity
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Data model failing schema checks
    #[error("Invalid data model for organization '{organization_id}': {}", join_errors(.errors))]
    InvalidDataModel {
        organization_id: String,
        errors: Vec<SchemaError>,
    },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Backend failure
    #[error("Storage error: {0}")]
    Storage(String),
}

fn join_errors(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl RepositoryError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        RepositoryError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
