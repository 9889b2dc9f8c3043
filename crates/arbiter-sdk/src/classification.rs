//! Score aggregation and outcome classification
//!
//! Thresholds are inclusive lower bounds:
//!
//! - `score >= reject` declines
//! - `review <= score < reject` falls in the review band, which the scenario's
//!   [`ReviewMode`] maps to `Review` or `BlockAndReview`
//! - anything lower approves

use arbiter_core::decision::{Outcome, ReviewStatus, RuleExecution};
use arbiter_core::ReviewMode;

/// Sum of applied score modifiers, saturating at the i32 bounds
pub fn total_score(executions: &[RuleExecution]) -> i32 {
    executions
        .iter()
        .fold(0i32, |acc, e| acc.saturating_add(e.applied_score_modifier))
}

/// Outcome for a score under the given thresholds
pub fn classify(
    score: i32,
    review_threshold: i32,
    reject_threshold: i32,
    mode: ReviewMode,
) -> Outcome {
    if score >= reject_threshold {
        Outcome::Decline
    } else if score >= review_threshold {
        match mode {
            ReviewMode::Review => Outcome::Review,
            ReviewMode::BlockAndReview => Outcome::BlockAndReview,
        }
    } else {
        Outcome::Approve
    }
}

/// Review status a new decision starts with
pub fn initial_review_status(outcome: Outcome) -> Option<ReviewStatus> {
    match outcome {
        Outcome::BlockAndReview => Some(ReviewStatus::Pending),
        _ => None,
    }
}
