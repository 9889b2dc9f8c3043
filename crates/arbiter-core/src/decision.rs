//! Decision and rule execution results

use crate::types::ClientObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final classification of a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Approve,
    Review,
    BlockAndReview,
    Decline,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Approve => "approve",
            Outcome::Review => "review",
            Outcome::BlockAndReview => "block_and_review",
            Outcome::Decline => "decline",
        };
        write!(f, "{s}")
    }
}

/// Review status of a block-and-review decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approve,
    Decline,
}

/// Outcome label of one rule execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOutcome {
    Hit,
    NoHit,
    Error,
}

/// Category of a rule evaluation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionErrorKind {
    ArityMismatch,
    TypeMismatch,
    NullOperand,
    DivisionByZero,
    ArithmeticOverflow,
    UnknownFunction,
    AccessorNotFound,
    /// Record lookup failed in the backing store
    Infrastructure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleExecutionError {
    pub kind: ExecutionErrorKind,
    pub message: String,
}

/// Result of evaluating one rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleExecution {
    pub rule_id: String,
    pub rule_name: String,

    /// Formula result; false when the evaluation failed
    pub result: bool,

    /// Declared score modifier of the rule
    pub score_modifier: i32,

    /// Score actually added: the modifier on a clean hit, 0 otherwise
    pub applied_score_modifier: i32,

    pub outcome: RuleOutcome,

    #[serde(default)]
    pub error: Option<RuleExecutionError>,
}

impl RuleExecution {
    /// Execution of a rule whose formula evaluated cleanly
    pub fn evaluated(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        score_modifier: i32,
        result: bool,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            result,
            score_modifier,
            applied_score_modifier: if result { score_modifier } else { 0 },
            outcome: if result { RuleOutcome::Hit } else { RuleOutcome::NoHit },
            error: None,
        }
    }

    /// Execution of a rule whose formula failed
    pub fn failed(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        score_modifier: i32,
        error: RuleExecutionError,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            result: false,
            score_modifier,
            applied_score_modifier: 0,
            outcome: RuleOutcome::Error,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Decision-level failure: the decision could not be fully computed because
/// of infrastructure errors on some rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionError {
    pub message: String,
    pub rule_ids: Vec<String>,
}

/// Scored and classified result for one trigger object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub organization_id: String,
    pub scenario_id: String,
    pub scenario_iteration_id: String,
    pub scenario_version: u32,
    pub score: i32,
    pub outcome: Outcome,

    /// Only set for block-and-review decisions
    #[serde(default)]
    pub review_status: Option<ReviewStatus>,

    /// One entry per rule, in evaluation order
    pub rule_executions: Vec<RuleExecution>,

    pub trigger_object: ClientObject,

    #[serde(default)]
    pub error: Option<DecisionError>,

    pub created_at: DateTime<Utc>,
}

impl Decision {
    /// Sum of the applied score modifiers
    pub fn total_applied_score(&self) -> i32 {
        self.rule_executions
            .iter()
            .map(|e| e.applied_score_modifier)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluated_execution() {
        let hit = RuleExecution::evaluated("r1", "high amount", 30, true);
        assert_eq!(hit.applied_score_modifier, 30);
        assert_eq!(hit.outcome, RuleOutcome::Hit);

        let miss = RuleExecution::evaluated("r1", "high amount", 30, false);
        assert_eq!(miss.applied_score_modifier, 0);
        assert_eq!(miss.outcome, RuleOutcome::NoHit);
    }

    #[test]
    fn test_failed_execution_applies_nothing() {
        let failed = RuleExecution::failed(
            "r1",
            "ratio",
            40,
            RuleExecutionError {
                kind: ExecutionErrorKind::DivisionByZero,
                message: "Division by zero".to_string(),
            },
        );
        assert!(failed.is_error());
        assert!(!failed.result);
        assert_eq!(failed.applied_score_modifier, 0);
        assert_eq!(failed.outcome, RuleOutcome::Error);
    }

    #[test]
    fn test_outcome_wire_names() {
        assert_eq!(
            serde_json::to_value(Outcome::BlockAndReview).unwrap(),
            serde_json::json!("block_and_review")
        );
        assert_eq!(Outcome::Decline.to_string(), "decline");
    }
}
