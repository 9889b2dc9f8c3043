//! SDK error types

use arbiter_core::PayloadError;
use arbiter_repository::RepositoryError;
use arbiter_runtime::ValidationError;
use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Payload rejected by the table definition
    #[error("Invalid payload: {0}")]
    Payload(#[from] PayloadError),

    /// Operation refused by the current state (committed iteration, already live, ...)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown scenario, iteration, table, rule or decision
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Iteration failed static validation
    #[error("Invalid iteration: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// Request inconsistent with the target scenario
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Storage or record lookup failure
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    /// Other repository failure
    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for SdkError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound { entity, id } => SdkError::NotFound { entity, id },
            RepositoryError::Conflict(message) => SdkError::Conflict(message),
            RepositoryError::Storage(message) => SdkError::Infrastructure(message),
            other => SdkError::Repository(other),
        }
    }
}

impl SdkError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        SdkError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_map_to_taxonomy() {
        let err: SdkError = RepositoryError::Conflict("already committed".to_string()).into();
        assert!(matches!(err, SdkError::Conflict(_)));

        let err: SdkError = RepositoryError::NotFound {
            entity: "Scenario",
            id: "s1".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Scenario not found: s1");

        let err: SdkError = RepositoryError::Storage("disk full".to_string()).into();
        assert!(matches!(err, SdkError::Infrastructure(_)));
    }

    #[test]
    fn test_validation_message() {
        let err = SdkError::Validation(vec![
            ValidationError::MissingTrigger,
            ValidationError::MissingThresholds,
        ]);
        assert_eq!(
            err.to_string(),
            "Invalid iteration: Trigger condition is missing; Score thresholds are missing"
        );
    }
}
