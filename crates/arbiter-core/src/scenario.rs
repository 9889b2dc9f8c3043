//! Scenario and iteration definitions

use crate::ast::Node;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scored condition inside an iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique rule identifier
    pub id: String,

    /// Rule name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Evaluation order within the iteration; ties are broken by id
    #[serde(default)]
    pub display_order: i32,

    /// Boolean formula
    pub formula: Node,

    /// Score added to the decision when the formula is true
    pub score_modifier: i32,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        formula: Node,
        score_modifier: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            display_order: 0,
            formula,
            score_modifier,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_display_order(mut self, display_order: i32) -> Self {
        self.display_order = display_order;
        self
    }
}

/// Lifecycle state of an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationState {
    Draft,
    Committed,
}

/// Outcome used for scores in the review band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    /// Flag the decision for review, the trigger object proceeds
    #[default]
    Review,
    /// Hold the trigger object until a case reviewer settles the decision
    BlockAndReview,
}

/// Stable identity owning iterations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,

    /// Table whose records trigger this scenario
    pub trigger_object_table: String,

    #[serde(default)]
    pub review_mode: ReviewMode,

    pub created_at: DateTime<Utc>,
}

/// One versioned rule-set definition
///
/// Drafts are edited freely. Committed iterations are frozen: their trigger,
/// rules and thresholds never change again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioIteration {
    pub id: String,
    pub organization_id: String,
    pub scenario_id: String,

    /// Per-scenario version, assigned at commit
    #[serde(default)]
    pub version: Option<u32>,

    pub state: IterationState,

    #[serde(default)]
    pub trigger_condition: Option<Node>,

    #[serde(default)]
    pub rules: Vec<Rule>,

    #[serde(default)]
    pub score_review_threshold: Option<i32>,

    #[serde(default)]
    pub score_reject_threshold: Option<i32>,

    /// Cron-like schedule for batch runs
    #[serde(default)]
    pub schedule: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScenarioIteration {
    pub fn is_draft(&self) -> bool {
        self.state == IterationState::Draft
    }

    pub fn is_committed(&self) -> bool {
        self.state == IterationState::Committed
    }

    /// Rules in evaluation order
    pub fn ordered_rules(&self) -> Vec<&Rule> {
        let mut rules: Vec<&Rule> = self.rules.iter().collect();
        rules.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.id.cmp(&b.id))
        });
        rules
    }

    pub fn rule(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == rule_id)
    }
}
