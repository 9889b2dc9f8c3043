//! Core trait definitions for the repository pattern
//!
//! Every method is scoped by organization: an entity owned by another
//! organization is reported as not found.
//!
//! # Implementation Notes
//!
//! - Each write is atomic. `commit_iteration` and `publish_iteration` check
//!   their preconditions and apply their changes under a single commit
//!   boundary, so a concurrent writer can never observe or produce a half
//!   applied state.
//! - The publication log is append-only. The live iteration pointer is
//!   updated together with the log entries that change it.
//!
//! # Thread Safety
//!
//! All implementations must be `Send + Sync` for use across async tasks.

use crate::RepositoryResult;
use arbiter_core::{Decision, DataModel, Scenario, ScenarioIteration, ScenarioPublication};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Table definitions of organizations
#[async_trait]
pub trait DataModelRepository: Send + Sync {
    async fn get_data_model(&self, organization_id: &str) -> RepositoryResult<DataModel>;

    /// Store a data model; models failing `DataModel::validate` are refused
    /// with `RepositoryError::InvalidDataModel`
    async fn save_data_model(
        &self,
        organization_id: &str,
        data_model: DataModel,
    ) -> RepositoryResult<()>;
}

/// Scenarios and iterations
#[async_trait]
pub trait ScenarioRepository: Send + Sync {
    async fn get_scenario(&self, organization_id: &str, scenario_id: &str)
        -> RepositoryResult<Scenario>;

    async fn list_scenarios(&self, organization_id: &str) -> RepositoryResult<Vec<Scenario>>;

    /// Store a new scenario; conflict if the id is taken
    async fn create_scenario(&self, scenario: Scenario) -> RepositoryResult<Scenario>;

    async fn get_iteration(
        &self,
        organization_id: &str,
        iteration_id: &str,
    ) -> RepositoryResult<ScenarioIteration>;

    /// Iterations of a scenario, oldest first
    async fn list_iterations(
        &self,
        organization_id: &str,
        scenario_id: &str,
    ) -> RepositoryResult<Vec<ScenarioIteration>>;

    /// Store a new draft iteration of an existing scenario
    async fn create_iteration(
        &self,
        iteration: ScenarioIteration,
    ) -> RepositoryResult<ScenarioIteration>;

    /// Replace a draft iteration
    ///
    /// Conflict if the stored iteration is committed, or if its `updated_at`
    /// differs from the one carried by `iteration` (concurrent edit). The
    /// returned iteration carries the new `updated_at`.
    async fn update_draft_iteration(
        &self,
        iteration: ScenarioIteration,
    ) -> RepositoryResult<ScenarioIteration>;

    /// Freeze a draft, assigning the next per-scenario version
    ///
    /// Conflict if the iteration is already committed or changed since
    /// `expected_updated_at`.
    async fn commit_iteration(
        &self,
        organization_id: &str,
        iteration_id: &str,
        expected_updated_at: DateTime<Utc>,
    ) -> RepositoryResult<ScenarioIteration>;
}

/// Publication log and live iteration pointer
#[async_trait]
pub trait PublicationRepository: Send + Sync {
    /// Make a committed iteration live
    ///
    /// Appends an unpublish entry for the previously live iteration, if any,
    /// then a publish entry, and moves the live pointer. Conflict if the
    /// iteration is a draft or already live. Returns the appended entries.
    async fn publish_iteration(
        &self,
        organization_id: &str,
        scenario_id: &str,
        iteration_id: &str,
    ) -> RepositoryResult<Vec<ScenarioPublication>>;

    /// Leave the scenario without a live iteration; conflict if none is live
    async fn unpublish_scenario(
        &self,
        organization_id: &str,
        scenario_id: &str,
    ) -> RepositoryResult<ScenarioPublication>;

    async fn live_iteration_id(
        &self,
        organization_id: &str,
        scenario_id: &str,
    ) -> RepositoryResult<Option<String>>;

    /// Log entries of a scenario in rank order
    async fn list_publications(
        &self,
        organization_id: &str,
        scenario_id: &str,
    ) -> RepositoryResult<Vec<ScenarioPublication>>;
}

/// Stored decisions
#[async_trait]
pub trait DecisionRepository: Send + Sync {
    async fn store_decision(&self, decision: Decision) -> RepositoryResult<()>;

    async fn get_decision(&self, organization_id: &str, decision_id: &str)
        -> RepositoryResult<Decision>;

    /// Decisions in creation order, optionally for one scenario
    async fn list_decisions(
        &self,
        organization_id: &str,
        scenario_id: Option<&str>,
    ) -> RepositoryResult<Vec<Decision>>;
}

/// Everything the decision engine reads and writes
pub trait EngineRepository:
    DataModelRepository + ScenarioRepository + PublicationRepository + DecisionRepository
{
}

impl<T> EngineRepository for T where
    T: DataModelRepository + ScenarioRepository + PublicationRepository + DecisionRepository
{
}
