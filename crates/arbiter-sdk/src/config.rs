//! Configuration types for DecisionEngine

use crate::error::{Result, SdkError};
use arbiter_core::types::Strictness;
use serde::{Deserialize, Serialize};

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of trigger objects decided concurrently in a batch
    pub max_concurrency: usize,

    /// Handling of payload fields the table does not declare
    pub payload_strictness: Strictness,

    /// Memoize linked record lookups within one decision
    pub memoize_accessors: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            payload_strictness: Strictness::Ignore,
            memoize_accessors: true,
        }
    }
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_payload_strictness(mut self, strictness: Strictness) -> Self {
        self.payload_strictness = strictness;
        self
    }

    pub fn with_memoized_accessors(mut self, enabled: bool) -> Self {
        self.memoize_accessors = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(SdkError::ConfigError(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::new();
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.payload_strictness, Strictness::Ignore);
        assert!(config.memoize_accessors);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"max_concurrency": 2, "payload_strictness": "reject"}"#)
                .unwrap();
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.payload_strictness, Strictness::Reject);
        assert!(config.memoize_accessors);
    }

    #[test]
    fn test_zero_concurrency_is_invalid() {
        let config = EngineConfig::new().with_max_concurrency(0);
        assert!(matches!(config.validate(), Err(SdkError::ConfigError(_))));
    }
}
