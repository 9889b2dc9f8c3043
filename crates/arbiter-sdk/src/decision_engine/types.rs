//! Result types for DecisionEngine

use arbiter_core::{Decision, Outcome};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Result of running one scenario against one trigger object
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionAttempt {
    /// The trigger condition did not hold; nothing was evaluated or stored
    TriggerNotMatched,

    /// A decision was produced and stored
    Decided(Decision),
}

impl DecisionAttempt {
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            DecisionAttempt::Decided(decision) => Some(decision),
            DecisionAttempt::TriggerNotMatched => None,
        }
    }

    pub fn into_decision(self) -> Option<Decision> {
        match self {
            DecisionAttempt::Decided(decision) => Some(decision),
            DecisionAttempt::TriggerNotMatched => None,
        }
    }
}

/// Cooperative cancellation of a batch
///
/// Items already running when the token fires or the deadline passes run to
/// completion; items not yet started are counted as cancelled.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub cancel: Option<CancellationToken>,
    pub deadline: Option<Instant>,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Whether the token fired or the deadline passed
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Counters of a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub approved: usize,
    pub review: usize,
    pub block_and_review: usize,
    pub declined: usize,
    /// Trigger condition not matched
    pub skipped: usize,
    /// Decision could not be produced or carries a decision-level error
    pub errored: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    pub(crate) fn record_decision(&mut self, decision: &Decision) {
        self.total += 1;
        match decision.outcome {
            Outcome::Approve => self.approved += 1,
            Outcome::Review => self.review += 1,
            Outcome::BlockAndReview => self.block_and_review += 1,
            Outcome::Decline => self.declined += 1,
        }
        if decision.error.is_some() {
            self.errored += 1;
        }
    }

    pub(crate) fn record_skipped(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }

    pub(crate) fn record_failure(&mut self) {
        self.total += 1;
        self.errored += 1;
    }

    pub(crate) fn record_cancelled(&mut self) {
        self.total += 1;
        self.cancelled += 1;
    }

    /// Number of decisions produced
    pub fn decided(&self) -> usize {
        self.approved + self.review + self.block_and_review + self.declined
    }

    pub fn merge(&mut self, other: &BatchSummary) {
        self.total += other.total;
        self.approved += other.approved;
        self.review += other.review;
        self.block_and_review += other.block_and_review;
        self.declined += other.declined;
        self.skipped += other.skipped;
        self.errored += other.errored;
        self.cancelled += other.cancelled;
    }
}

/// A batch item for which no decision could be produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Position of the object in the batch, or of the scenario for create-all
    pub index: usize,
    pub scenario_id: String,
    pub object_id: Option<String>,
    pub message: String,
}

/// Decisions and counters of a batch run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Stored decisions, in completion order
    pub decisions: Vec<Decision>,
    pub failures: Vec<BatchFailure>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn merge(&mut self, other: BatchReport) {
        self.decisions.extend(other.decisions);
        self.failures.extend(other.failures);
        self.summary.merge(&other.summary);
    }
}
