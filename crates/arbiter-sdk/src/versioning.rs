//! Scenario versioning
//!
//! Iterations move from `Draft` to `Committed` once and never back. Only
//! drafts can be edited; a draft is validated against the function catalog
//! and the data model before it may be committed. Independently, one
//! committed iteration per scenario can be live, which is tracked by the
//! repository's publication log.

use crate::error::{Result, SdkError};
use arbiter_core::{
    FunctionCatalog, IterationState, Node, ReviewMode, Rule, Scenario, ScenarioIteration,
    ScenarioPublication,
};
use arbiter_repository::EngineRepository;
use arbiter_runtime::IterationValidator;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Parameters of a new scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub trigger_object_table: String,
    #[serde(default)]
    pub review_mode: ReviewMode,
}

impl NewScenario {
    pub fn new(name: impl Into<String>, trigger_object_table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            trigger_object_table: trigger_object_table.into(),
            review_mode: ReviewMode::Review,
        }
    }

    pub fn with_review_mode(mut self, review_mode: ReviewMode) -> Self {
        self.review_mode = review_mode;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Parameters of a rule added to or replaced in a draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRule {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    pub formula: Node,
    pub score_modifier: i32,
}

impl NewRule {
    pub fn new(name: impl Into<String>, formula: Node, score_modifier: i32) -> Self {
        Self {
            name: name.into(),
            description: None,
            display_order: 0,
            formula,
            score_modifier,
        }
    }

    pub fn with_display_order(mut self, display_order: i32) -> Self {
        self.display_order = display_order;
        self
    }

    fn into_rule(self, id: String) -> Rule {
        Rule {
            id,
            name: self.name,
            description: self.description,
            display_order: self.display_order,
            formula: self.formula,
            score_modifier: self.score_modifier,
        }
    }
}

/// Content of a draft created from scratch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewIteration {
    #[serde(default)]
    pub trigger_condition: Option<Node>,
    #[serde(default)]
    pub rules: Vec<NewRule>,
    #[serde(default)]
    pub score_review_threshold: Option<i32>,
    #[serde(default)]
    pub score_reject_threshold: Option<i32>,
    #[serde(default)]
    pub schedule: Option<String>,
}

/// Partial update of a draft; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationUpdate {
    #[serde(default)]
    pub trigger_condition: Option<Node>,
    #[serde(default)]
    pub score_review_threshold: Option<i32>,
    #[serde(default)]
    pub score_reject_threshold: Option<i32>,
    /// `Some(None)` clears the schedule
    #[serde(default)]
    pub schedule: Option<Option<String>>,
}

/// Draft, commit and publication operations
#[derive(Clone)]
pub struct ScenarioVersioning {
    repository: Arc<dyn EngineRepository>,
    catalog: Arc<FunctionCatalog>,
}

impl ScenarioVersioning {
    pub fn new(repository: Arc<dyn EngineRepository>, catalog: Arc<FunctionCatalog>) -> Self {
        Self {
            repository,
            catalog,
        }
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    /// Create a scenario triggered by a table of the organization's data model
    pub async fn create_scenario(
        &self,
        organization_id: &str,
        params: NewScenario,
    ) -> Result<Scenario> {
        let data_model = self.repository.get_data_model(organization_id).await?;
        if data_model.table(&params.trigger_object_table).is_none() {
            return Err(SdkError::not_found("Table", params.trigger_object_table));
        }

        let scenario = Scenario {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            name: params.name,
            description: params.description,
            trigger_object_table: params.trigger_object_table,
            review_mode: params.review_mode,
            created_at: Utc::now(),
        };
        let scenario = self.repository.create_scenario(scenario).await?;
        tracing::info!("Created scenario '{}' ({})", scenario.name, scenario.id);
        Ok(scenario)
    }

    pub async fn list_iterations(
        &self,
        organization_id: &str,
        scenario_id: &str,
    ) -> Result<Vec<ScenarioIteration>> {
        Ok(self
            .repository
            .list_iterations(organization_id, scenario_id)
            .await?)
    }

    // =========================================================================
    // Drafts
    // =========================================================================

    /// Create a draft from scratch
    pub async fn create_draft(
        &self,
        organization_id: &str,
        scenario_id: &str,
        params: NewIteration,
    ) -> Result<ScenarioIteration> {
        self.repository
            .get_scenario(organization_id, scenario_id)
            .await?;

        let now = Utc::now();
        let draft = ScenarioIteration {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            scenario_id: scenario_id.to_string(),
            version: None,
            state: IterationState::Draft,
            trigger_condition: params.trigger_condition,
            rules: params
                .rules
                .into_iter()
                .map(|r| r.into_rule(Uuid::new_v4().to_string()))
                .collect(),
            score_review_threshold: params.score_review_threshold,
            score_reject_threshold: params.score_reject_threshold,
            schedule: params.schedule,
            created_at: now,
            updated_at: now,
        };

        let draft = self.repository.create_iteration(draft).await?;
        tracing::info!("Created draft {} of scenario {}", draft.id, scenario_id);
        Ok(draft)
    }

    /// Create a draft copying a committed iteration
    ///
    /// Rules get fresh ids; the source is left untouched. Branching from a
    /// draft is a conflict.
    pub async fn create_draft_from(
        &self,
        organization_id: &str,
        source_iteration_id: &str,
    ) -> Result<ScenarioIteration> {
        let source = self
            .repository
            .get_iteration(organization_id, source_iteration_id)
            .await?;
        if !source.is_committed() {
            return Err(SdkError::Conflict(format!(
                "iteration {} is a draft, only committed iterations can be copied",
                source.id
            )));
        }

        let now = Utc::now();
        let draft = ScenarioIteration {
            id: Uuid::new_v4().to_string(),
            version: None,
            state: IterationState::Draft,
            rules: source
                .rules
                .iter()
                .map(|rule| Rule {
                    id: Uuid::new_v4().to_string(),
                    ..rule.clone()
                })
                .collect(),
            created_at: now,
            updated_at: now,
            ..source
        };

        let draft = self.repository.create_iteration(draft).await?;
        tracing::info!(
            "Created draft {} of scenario {} from iteration {}",
            draft.id,
            draft.scenario_id,
            source_iteration_id
        );
        Ok(draft)
    }

    /// Replace the trigger, thresholds or schedule of a draft
    pub async fn update_draft(
        &self,
        organization_id: &str,
        iteration_id: &str,
        update: IterationUpdate,
    ) -> Result<ScenarioIteration> {
        let (_, draft) = self
            .edit_draft(organization_id, iteration_id, |draft| {
                if let Some(trigger) = update.trigger_condition {
                    draft.trigger_condition = Some(trigger);
                }
                if let Some(review) = update.score_review_threshold {
                    draft.score_review_threshold = Some(review);
                }
                if let Some(reject) = update.score_reject_threshold {
                    draft.score_reject_threshold = Some(reject);
                }
                if let Some(schedule) = update.schedule {
                    draft.schedule = schedule;
                }
                Ok(())
            })
            .await?;
        Ok(draft)
    }

    pub async fn add_rule(
        &self,
        organization_id: &str,
        iteration_id: &str,
        params: NewRule,
    ) -> Result<Rule> {
        let (rule, _) = self
            .edit_draft(organization_id, iteration_id, |draft| {
                let rule = params.into_rule(Uuid::new_v4().to_string());
                draft.rules.push(rule.clone());
                Ok(rule)
            })
            .await?;
        Ok(rule)
    }

    pub async fn update_rule(
        &self,
        organization_id: &str,
        iteration_id: &str,
        rule_id: &str,
        params: NewRule,
    ) -> Result<Rule> {
        let (rule, _) = self
            .edit_draft(organization_id, iteration_id, |draft| {
                let slot = draft
                    .rules
                    .iter_mut()
                    .find(|r| r.id == rule_id)
                    .ok_or_else(|| SdkError::not_found("Rule", rule_id))?;
                *slot = params.into_rule(rule_id.to_string());
                Ok(slot.clone())
            })
            .await?;
        Ok(rule)
    }

    pub async fn delete_rule(
        &self,
        organization_id: &str,
        iteration_id: &str,
        rule_id: &str,
    ) -> Result<()> {
        self.edit_draft(organization_id, iteration_id, |draft| {
            let before = draft.rules.len();
            draft.rules.retain(|r| r.id != rule_id);
            if draft.rules.len() == before {
                return Err(SdkError::not_found("Rule", rule_id));
            }
            Ok(())
        })
        .await?;
        Ok(())
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Check an iteration against the catalog and the data model
    pub async fn validate(&self, organization_id: &str, iteration_id: &str) -> Result<()> {
        let iteration = self
            .repository
            .get_iteration(organization_id, iteration_id)
            .await?;
        self.validate_iteration(&iteration).await
    }

    /// Freeze a valid draft and assign it the next version of its scenario
    pub async fn commit(
        &self,
        organization_id: &str,
        iteration_id: &str,
    ) -> Result<ScenarioIteration> {
        let draft = self
            .repository
            .get_iteration(organization_id, iteration_id)
            .await?;
        if draft.is_committed() {
            return Err(SdkError::Conflict(format!(
                "iteration {} is already committed",
                draft.id
            )));
        }

        self.validate_iteration(&draft).await?;

        let committed = self
            .repository
            .commit_iteration(organization_id, iteration_id, draft.updated_at)
            .await?;
        tracing::info!(
            "Committed iteration {} of scenario {} as version {}",
            committed.id,
            committed.scenario_id,
            committed.version.unwrap_or_default()
        );
        Ok(committed)
    }

    // =========================================================================
    // Publication
    // =========================================================================

    /// Make a committed iteration the live one of its scenario
    ///
    /// Returns the log entries appended: an unpublish of the previously live
    /// iteration, if any, then the publish.
    pub async fn publish(
        &self,
        organization_id: &str,
        iteration_id: &str,
    ) -> Result<Vec<ScenarioPublication>> {
        let iteration = self
            .repository
            .get_iteration(organization_id, iteration_id)
            .await?;
        let entries = self
            .repository
            .publish_iteration(organization_id, &iteration.scenario_id, iteration_id)
            .await?;
        tracing::info!(
            "Published iteration {} (v{}) of scenario {}",
            iteration_id,
            iteration.version.unwrap_or_default(),
            iteration.scenario_id
        );
        Ok(entries)
    }

    /// Leave a scenario without a live iteration
    pub async fn unpublish(
        &self,
        organization_id: &str,
        scenario_id: &str,
    ) -> Result<ScenarioPublication> {
        let entry = self
            .repository
            .unpublish_scenario(organization_id, scenario_id)
            .await?;
        tracing::info!(
            "Unpublished iteration {} of scenario {}",
            entry.iteration_id,
            scenario_id
        );
        Ok(entry)
    }

    pub async fn live_iteration(
        &self,
        organization_id: &str,
        scenario_id: &str,
    ) -> Result<Option<ScenarioIteration>> {
        match self
            .repository
            .live_iteration_id(organization_id, scenario_id)
            .await?
        {
            Some(id) => Ok(Some(
                self.repository.get_iteration(organization_id, &id).await?,
            )),
            None => Ok(None),
        }
    }

    pub async fn is_live(&self, organization_id: &str, iteration_id: &str) -> Result<bool> {
        let iteration = self
            .repository
            .get_iteration(organization_id, iteration_id)
            .await?;
        let live = self
            .repository
            .live_iteration_id(organization_id, &iteration.scenario_id)
            .await?;
        Ok(live.as_deref() == Some(iteration_id))
    }

    pub async fn publications(
        &self,
        organization_id: &str,
        scenario_id: &str,
    ) -> Result<Vec<ScenarioPublication>> {
        Ok(self
            .repository
            .list_publications(organization_id, scenario_id)
            .await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn validate_iteration(&self, iteration: &ScenarioIteration) -> Result<()> {
        let scenario = self
            .repository
            .get_scenario(&iteration.organization_id, &iteration.scenario_id)
            .await?;
        let data_model = self
            .repository
            .get_data_model(&iteration.organization_id)
            .await?;

        IterationValidator::new(&self.catalog, &data_model)
            .validate(&scenario.trigger_object_table, iteration)
            .map_err(|errors| {
                tracing::debug!(
                    "Iteration {} failed validation with {} error(s)",
                    iteration.id,
                    errors.len()
                );
                SdkError::Validation(errors)
            })
    }

    /// Load a draft, apply `edit` and store it
    ///
    /// Committed iterations are a conflict. The store rejects the write if the
    /// draft changed since it was read.
    async fn edit_draft<T>(
        &self,
        organization_id: &str,
        iteration_id: &str,
        edit: impl FnOnce(&mut ScenarioIteration) -> Result<T>,
    ) -> Result<(T, ScenarioIteration)> {
        let mut draft = self
            .repository
            .get_iteration(organization_id, iteration_id)
            .await?;
        if !draft.is_draft() {
            return Err(SdkError::Conflict(format!(
                "iteration {} is committed and cannot be edited",
                draft.id
            )));
        }

        let value = edit(&mut draft)?;
        let stored = self.repository.update_draft_iteration(draft).await?;
        tracing::debug!("Updated draft {}", stored.id);
        Ok((value, stored))
    }
}
