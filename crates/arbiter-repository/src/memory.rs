//! In-memory repository
//!
//! All state sits behind one `RwLock`; every write method takes the write
//! lock once, checks its preconditions and applies its changes before
//! releasing it. That lock is the transaction boundary for commits and for
//! the publication log plus live pointer.

use crate::snapshot::RepositorySnapshot;
use crate::traits::{
    DataModelRepository, DecisionRepository, PublicationRepository, ScenarioRepository,
};
use crate::{RepositoryError, RepositoryResult};
use arbiter_core::publication::replay_live_iteration;
use arbiter_core::{
    DataModel, Decision, IterationState, PublicationAction, Scenario, ScenarioIteration,
    ScenarioPublication,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    data_models: HashMap<String, DataModel>,
    scenarios: HashMap<String, Scenario>,
    iterations: HashMap<String, ScenarioIteration>,
    publications: Vec<ScenarioPublication>,
    /// scenario id to live iteration id
    live: HashMap<String, String>,
    last_rank: u64,
    decisions: Vec<Decision>,
}

impl State {
    fn scenario(&self, organization_id: &str, scenario_id: &str) -> RepositoryResult<&Scenario> {
        self.scenarios
            .get(scenario_id)
            .filter(|s| s.organization_id == organization_id)
            .ok_or_else(|| RepositoryError::not_found("Scenario", scenario_id))
    }

    fn iteration(
        &self,
        organization_id: &str,
        iteration_id: &str,
    ) -> RepositoryResult<&ScenarioIteration> {
        self.iterations
            .get(iteration_id)
            .filter(|i| i.organization_id == organization_id)
            .ok_or_else(|| RepositoryError::not_found("Iteration", iteration_id))
    }

    fn iteration_mut(
        &mut self,
        organization_id: &str,
        iteration_id: &str,
    ) -> RepositoryResult<&mut ScenarioIteration> {
        self.iterations
            .get_mut(iteration_id)
            .filter(|i| i.organization_id == organization_id)
            .ok_or_else(|| RepositoryError::not_found("Iteration", iteration_id))
    }

    fn append(
        &mut self,
        organization_id: &str,
        scenario_id: &str,
        iteration_id: &str,
        action: PublicationAction,
    ) -> ScenarioPublication {
        self.last_rank += 1;
        let entry = ScenarioPublication {
            id: uuid::Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            scenario_id: scenario_id.to_string(),
            iteration_id: iteration_id.to_string(),
            action,
            rank: self.last_rank,
            created_at: Utc::now(),
        };
        self.publications.push(entry.clone());
        entry
    }
}

fn validate_data_model(organization_id: &str, data_model: &DataModel) -> RepositoryResult<()> {
    data_model
        .validate()
        .map_err(|errors| RepositoryError::InvalidDataModel {
            organization_id: organization_id.to_string(),
            errors,
        })
}

/// A timestamp strictly after `previous`
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous
            .checked_add_signed(TimeDelta::microseconds(1))
            .unwrap_or(now)
    }
}

/// In-memory implementation of every repository trait
#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository from a snapshot
    ///
    /// Data models must pass their schema checks, iterations must reference
    /// known scenarios and publication ranks must be unique. Live pointers
    /// are rebuilt by replaying the log.
    pub fn from_snapshot(snapshot: RepositorySnapshot) -> RepositoryResult<Self> {
        for (organization_id, data_model) in &snapshot.data_models {
            validate_data_model(organization_id, data_model)?;
        }

        let mut state = State {
            data_models: snapshot.data_models.into_iter().collect(),
            ..State::default()
        };

        for scenario in snapshot.scenarios {
            if state.scenarios.contains_key(&scenario.id) {
                return Err(RepositoryError::Storage(format!(
                    "duplicate scenario {}",
                    scenario.id
                )));
            }
            state.scenarios.insert(scenario.id.clone(), scenario);
        }

        for iteration in snapshot.iterations {
            state.scenario(&iteration.organization_id, &iteration.scenario_id)?;
            if state.iterations.contains_key(&iteration.id) {
                return Err(RepositoryError::Storage(format!(
                    "duplicate iteration {}",
                    iteration.id
                )));
            }
            state.iterations.insert(iteration.id.clone(), iteration);
        }

        let mut publications = snapshot.publications;
        publications.sort_by_key(|p| p.rank);
        if publications.windows(2).any(|w| w[0].rank == w[1].rank) {
            return Err(RepositoryError::Storage(
                "publication ranks must be unique".to_string(),
            ));
        }
        state.last_rank = publications.last().map(|p| p.rank).unwrap_or(0);

        for scenario_id in state.scenarios.keys() {
            if let Some(live) = replay_live_iteration(scenario_id, &publications) {
                let committed = state
                    .iterations
                    .get(&live)
                    .map(ScenarioIteration::is_committed)
                    .unwrap_or(false);
                if !committed {
                    return Err(RepositoryError::Storage(format!(
                        "live iteration {live} of scenario {scenario_id} is not committed"
                    )));
                }
                state.live.insert(scenario_id.clone(), live);
            }
        }
        state.publications = publications;

        tracing::info!(
            "Loaded snapshot: {} scenarios, {} iterations, {} live",
            state.scenarios.len(),
            state.iterations.len(),
            state.live.len()
        );
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Export the definitions as a snapshot; decisions are not included
    pub async fn snapshot(&self) -> RepositorySnapshot {
        let state = self.state.read().await;
        let mut scenarios: Vec<Scenario> = state.scenarios.values().cloned().collect();
        scenarios.sort_by(|a, b| a.id.cmp(&b.id));
        let mut iterations: Vec<ScenarioIteration> = state.iterations.values().cloned().collect();
        iterations.sort_by(|a, b| a.id.cmp(&b.id));

        RepositorySnapshot {
            data_models: state
                .data_models
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            scenarios,
            iterations,
            publications: state.publications.clone(),
        }
    }

    /// Check every live pointer against a replay of the publication log
    pub async fn verify_live_pointers(&self) -> RepositoryResult<()> {
        let state = self.state.read().await;
        for scenario_id in state.scenarios.keys() {
            let replayed = replay_live_iteration(scenario_id, &state.publications);
            if replayed.as_ref() != state.live.get(scenario_id) {
                return Err(RepositoryError::Storage(format!(
                    "live pointer of scenario {scenario_id} disagrees with the publication log"
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DataModelRepository for MemoryRepository {
    async fn get_data_model(&self, organization_id: &str) -> RepositoryResult<DataModel> {
        let state = self.state.read().await;
        state
            .data_models
            .get(organization_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("Data model", organization_id))
    }

    async fn save_data_model(
        &self,
        organization_id: &str,
        data_model: DataModel,
    ) -> RepositoryResult<()> {
        validate_data_model(organization_id, &data_model)?;
        let mut state = self.state.write().await;
        state
            .data_models
            .insert(organization_id.to_string(), data_model);
        Ok(())
    }
}

#[async_trait]
impl ScenarioRepository for MemoryRepository {
    async fn get_scenario(
        &self,
        organization_id: &str,
        scenario_id: &str,
    ) -> RepositoryResult<Scenario> {
        let state = self.state.read().await;
        state.scenario(organization_id, scenario_id).cloned()
    }

    async fn list_scenarios(&self, organization_id: &str) -> RepositoryResult<Vec<Scenario>> {
        let state = self.state.read().await;
        let mut scenarios: Vec<Scenario> = state
            .scenarios
            .values()
            .filter(|s| s.organization_id == organization_id)
            .cloned()
            .collect();
        scenarios.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(scenarios)
    }

    async fn create_scenario(&self, scenario: Scenario) -> RepositoryResult<Scenario> {
        let mut state = self.state.write().await;
        if state.scenarios.contains_key(&scenario.id) {
            return Err(RepositoryError::Conflict(format!(
                "scenario {} already exists",
                scenario.id
            )));
        }
        state.scenarios.insert(scenario.id.clone(), scenario.clone());
        Ok(scenario)
    }

    async fn get_iteration(
        &self,
        organization_id: &str,
        iteration_id: &str,
    ) -> RepositoryResult<ScenarioIteration> {
        let state = self.state.read().await;
        state.iteration(organization_id, iteration_id).cloned()
    }

    async fn list_iterations(
        &self,
        organization_id: &str,
        scenario_id: &str,
    ) -> RepositoryResult<Vec<ScenarioIteration>> {
        let state = self.state.read().await;
        state.scenario(organization_id, scenario_id)?;
        let mut iterations: Vec<ScenarioIteration> = state
            .iterations
            .values()
            .filter(|i| i.scenario_id == scenario_id)
            .cloned()
            .collect();
        iterations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(iterations)
    }

    async fn create_iteration(
        &self,
        iteration: ScenarioIteration,
    ) -> RepositoryResult<ScenarioIteration> {
        let mut state = self.state.write().await;
        state.scenario(&iteration.organization_id, &iteration.scenario_id)?;
        if !iteration.is_draft() {
            return Err(RepositoryError::Conflict(
                "new iterations must be drafts".to_string(),
            ));
        }
        if state.iterations.contains_key(&iteration.id) {
            return Err(RepositoryError::Conflict(format!(
                "iteration {} already exists",
                iteration.id
            )));
        }
        state.iterations.insert(iteration.id.clone(), iteration.clone());
        Ok(iteration)
    }

    async fn update_draft_iteration(
        &self,
        mut iteration: ScenarioIteration,
    ) -> RepositoryResult<ScenarioIteration> {
        let mut state = self.state.write().await;
        let stored = state.iteration_mut(&iteration.organization_id, &iteration.id)?;

        if !stored.is_draft() {
            return Err(RepositoryError::Conflict(format!(
                "iteration {} is committed and cannot be edited",
                iteration.id
            )));
        }
        if stored.updated_at != iteration.updated_at {
            return Err(RepositoryError::Conflict(format!(
                "iteration {} was modified concurrently",
                iteration.id
            )));
        }

        // Identity and lifecycle fields are not editable
        iteration.scenario_id = stored.scenario_id.clone();
        iteration.state = IterationState::Draft;
        iteration.version = None;
        iteration.created_at = stored.created_at;
        iteration.updated_at = next_timestamp(stored.updated_at);

        *stored = iteration.clone();
        Ok(iteration)
    }

    async fn commit_iteration(
        &self,
        organization_id: &str,
        iteration_id: &str,
        expected_updated_at: DateTime<Utc>,
    ) -> RepositoryResult<ScenarioIteration> {
        let mut state = self.state.write().await;
        let stored = state.iteration(organization_id, iteration_id)?;

        if stored.is_committed() {
            return Err(RepositoryError::Conflict(format!(
                "iteration {iteration_id} is already committed"
            )));
        }
        if stored.updated_at != expected_updated_at {
            return Err(RepositoryError::Conflict(format!(
                "iteration {iteration_id} was modified concurrently"
            )));
        }

        let scenario_id = stored.scenario_id.clone();
        let version = state
            .iterations
            .values()
            .filter(|i| i.scenario_id == scenario_id)
            .filter_map(|i| i.version)
            .max()
            .unwrap_or(0)
            + 1;

        let stored = state.iteration_mut(organization_id, iteration_id)?;
        stored.state = IterationState::Committed;
        stored.version = Some(version);
        stored.updated_at = next_timestamp(stored.updated_at);
        Ok(stored.clone())
    }
}

#[async_trait]
impl PublicationRepository for MemoryRepository {
    async fn publish_iteration(
        &self,
        organization_id: &str,
        scenario_id: &str,
        iteration_id: &str,
    ) -> RepositoryResult<Vec<ScenarioPublication>> {
        let mut state = self.state.write().await;
        state.scenario(organization_id, scenario_id)?;
        let iteration = state.iteration(organization_id, iteration_id)?;

        if iteration.scenario_id != scenario_id {
            return Err(RepositoryError::Conflict(format!(
                "iteration {iteration_id} does not belong to scenario {scenario_id}"
            )));
        }
        if !iteration.is_committed() {
            return Err(RepositoryError::Conflict(format!(
                "iteration {iteration_id} must be committed before it is published"
            )));
        }

        let previous = state.live.get(scenario_id).cloned();
        if previous.as_deref() == Some(iteration_id) {
            return Err(RepositoryError::Conflict(format!(
                "iteration {iteration_id} is already live"
            )));
        }

        let mut appended = Vec::with_capacity(2);
        if let Some(previous) = previous {
            appended.push(state.append(
                organization_id,
                scenario_id,
                &previous,
                PublicationAction::Unpublish,
            ));
        }
        appended.push(state.append(
            organization_id,
            scenario_id,
            iteration_id,
            PublicationAction::Publish,
        ));
        state
            .live
            .insert(scenario_id.to_string(), iteration_id.to_string());

        Ok(appended)
    }

    async fn unpublish_scenario(
        &self,
        organization_id: &str,
        scenario_id: &str,
    ) -> RepositoryResult<ScenarioPublication> {
        let mut state = self.state.write().await;
        state.scenario(organization_id, scenario_id)?;

        let Some(live) = state.live.remove(scenario_id) else {
            return Err(RepositoryError::Conflict(format!(
                "scenario {scenario_id} has no live iteration"
            )));
        };
        Ok(state.append(
            organization_id,
            scenario_id,
            &live,
            PublicationAction::Unpublish,
        ))
    }

    async fn live_iteration_id(
        &self,
        organization_id: &str,
        scenario_id: &str,
    ) -> RepositoryResult<Option<String>> {
        let state = self.state.read().await;
        state.scenario(organization_id, scenario_id)?;
        Ok(state.live.get(scenario_id).cloned())
    }

    async fn list_publications(
        &self,
        organization_id: &str,
        scenario_id: &str,
    ) -> RepositoryResult<Vec<ScenarioPublication>> {
        let state = self.state.read().await;
        state.scenario(organization_id, scenario_id)?;
        Ok(state
            .publications
            .iter()
            .filter(|p| p.scenario_id == scenario_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DecisionRepository for MemoryRepository {
    async fn store_decision(&self, decision: Decision) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        if state.decisions.iter().any(|d| d.id == decision.id) {
            return Err(RepositoryError::Conflict(format!(
                "decision {} already exists",
                decision.id
            )));
        }
        state.decisions.push(decision);
        Ok(())
    }

    async fn get_decision(
        &self,
        organization_id: &str,
        decision_id: &str,
    ) -> RepositoryResult<Decision> {
        let state = self.state.read().await;
        state
            .decisions
            .iter()
            .find(|d| d.id == decision_id && d.organization_id == organization_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("Decision", decision_id))
    }

    async fn list_decisions(
        &self,
        organization_id: &str,
        scenario_id: Option<&str>,
    ) -> RepositoryResult<Vec<Decision>> {
        let state = self.state.read().await;
        Ok(state
            .decisions
            .iter()
            .filter(|d| d.organization_id == organization_id)
            .filter(|d| scenario_id.map_or(true, |id| d.scenario_id == id))
            .cloned()
            .collect())
    }
}
