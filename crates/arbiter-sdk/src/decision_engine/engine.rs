//! Core DecisionEngine implementation

use super::observer::{notify_all, DecisionObserver};
use super::orchestrator::RuleOrchestrator;
use super::types::{BatchFailure, BatchOptions, BatchReport, DecisionAttempt};
use crate::config::EngineConfig;
use crate::error::{Result, SdkError};
use crate::versioning::ScenarioVersioning;
use arbiter_core::{
    ClientObject, DataModel, Decision, FunctionCatalog, PayloadParser, Scenario,
    ScenarioIteration,
};
use arbiter_repository::EngineRepository;
use arbiter_runtime::{EvaluationContext, Evaluator, RecordAccessor};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use uuid::Uuid;

/// Decision engine
///
/// Cheap to share behind an `Arc`: the catalog and the iterations it runs
/// are read-only, so any number of decisions can be computed concurrently.
pub struct DecisionEngine {
    /// Data models, scenarios, publications and stored decisions
    repository: Arc<dyn EngineRepository>,

    /// Linked record lookups for database accessors
    record_accessor: Arc<dyn RecordAccessor>,

    /// Function catalog shared with the evaluator and the validator
    catalog: Arc<FunctionCatalog>,

    orchestrator: RuleOrchestrator,

    parser: PayloadParser,

    config: EngineConfig,

    /// Notified after each stored decision
    observers: Vec<Arc<dyn DecisionObserver>>,
}

/// A scenario with its live iteration and the data model, fetched once per call
struct PreparedScenario {
    scenario: Scenario,
    iteration: ScenarioIteration,
    data_model: Arc<DataModel>,
}

enum ItemResult {
    Cancelled,
    Finished(Result<DecisionAttempt>),
}

impl DecisionEngine {
    pub(crate) fn new(
        repository: Arc<dyn EngineRepository>,
        record_accessor: Arc<dyn RecordAccessor>,
        catalog: Arc<FunctionCatalog>,
        config: EngineConfig,
        observers: Vec<Arc<dyn DecisionObserver>>,
    ) -> Self {
        let parser = PayloadParser::new().with_strictness(config.payload_strictness);
        Self {
            orchestrator: RuleOrchestrator::new(Evaluator::new(catalog.clone())),
            repository,
            record_accessor,
            catalog,
            parser,
            config,
            observers,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<FunctionCatalog> {
        &self.catalog
    }

    pub fn repository(&self) -> &Arc<dyn EngineRepository> {
        &self.repository
    }

    /// Scenario versioning over the same repository and catalog
    pub fn versioning(&self) -> ScenarioVersioning {
        ScenarioVersioning::new(self.repository.clone(), self.catalog.clone())
    }

    // =========================================================================
    // Payloads
    // =========================================================================

    /// Validate a raw payload against a table of the organization's data model
    pub async fn parse_payload(
        &self,
        organization_id: &str,
        table: &str,
        raw: &[u8],
    ) -> Result<ClientObject> {
        let data_model = self.repository.get_data_model(organization_id).await?;
        let table = data_model
            .table(table)
            .ok_or_else(|| SdkError::not_found("Table", table))?;

        let object = self.parser.parse(table, raw)?;
        tracing::debug!(
            "Parsed {} payload {:?}",
            table.name,
            object.object_id().unwrap_or_default()
        );
        Ok(object)
    }

    // =========================================================================
    // Decisions
    // =========================================================================

    /// Run the live iteration of a scenario against one trigger object
    pub async fn create_decision(
        &self,
        organization_id: &str,
        scenario_id: &str,
        object: ClientObject,
    ) -> Result<DecisionAttempt> {
        let scenario = self
            .repository
            .get_scenario(organization_id, scenario_id)
            .await?;
        let data_model = self.load_data_model(organization_id).await?;
        let prepared = self
            .prepare(scenario, data_model)
            .await?
            .ok_or_else(|| SdkError::not_found("Live iteration", scenario_id))?;

        self.decide_prepared(&prepared, object).await
    }

    /// Run every live scenario triggered by `table` against one object
    ///
    /// Scenarios without a live iteration are ignored. A scenario whose
    /// decision fails is reported in `failures` and does not stop the others.
    pub async fn create_all_decisions(
        &self,
        organization_id: &str,
        table: &str,
        object: ClientObject,
    ) -> Result<BatchReport> {
        if object.table_name != table {
            return Err(SdkError::InvalidRequest(format!(
                "object belongs to table '{}', not '{}'",
                object.table_name, table
            )));
        }

        let data_model = self.load_data_model(organization_id).await?;
        let scenarios: Vec<Scenario> = self
            .repository
            .list_scenarios(organization_id)
            .await?
            .into_iter()
            .filter(|s| s.trigger_object_table == table)
            .collect();

        tracing::debug!(
            "Creating decisions for {} scenario(s) on table {}",
            scenarios.len(),
            table
        );

        let object_id = object.object_id().map(str::to_string);
        let object = &object;
        let data_model = &data_model;

        let mut results = stream::iter(scenarios.into_iter().enumerate())
            .map(|(index, scenario)| async move {
                let scenario_id = scenario.id.clone();
                let result = match self.prepare(scenario, data_model.clone()).await {
                    Ok(Some(prepared)) => {
                        Some(self.decide_prepared(&prepared, object.clone()).await)
                    }
                    Ok(None) => None,
                    Err(e) => Some(Err(e)),
                };
                (index, scenario_id, result)
            })
            .buffer_unordered(self.concurrency());

        let mut report = BatchReport::default();
        while let Some((index, scenario_id, result)) = results.next().await {
            if let Some(result) = result {
                record(
                    &mut report,
                    index,
                    &scenario_id,
                    object_id.clone(),
                    ItemResult::Finished(result),
                );
            }
        }

        tracing::info!(
            "Table {} object {:?}: {} decision(s), {} skipped, {} errored",
            table,
            object_id,
            report.summary.decided(),
            report.summary.skipped,
            report.summary.errored
        );
        Ok(report)
    }

    /// Run the live iteration of a scenario against many trigger objects
    ///
    /// Objects are decided concurrently, at most `max_concurrency` at a time,
    /// and decisions come back in completion order. Once `options` signals
    /// cancellation, objects not yet started are counted as cancelled while
    /// running ones finish.
    pub async fn decide_batch(
        &self,
        organization_id: &str,
        scenario_id: &str,
        objects: Vec<ClientObject>,
        options: BatchOptions,
    ) -> Result<BatchReport> {
        let scenario = self
            .repository
            .get_scenario(organization_id, scenario_id)
            .await?;
        let data_model = self.load_data_model(organization_id).await?;
        let prepared = self
            .prepare(scenario, data_model)
            .await?
            .ok_or_else(|| SdkError::not_found("Live iteration", scenario_id))?;

        tracing::info!(
            "Deciding batch of {} object(s) for scenario {} (v{})",
            objects.len(),
            scenario_id,
            prepared.iteration.version.unwrap_or_default()
        );

        let prepared = &prepared;
        let options = &options;

        let mut results = stream::iter(objects.into_iter().enumerate())
            .map(|(index, object)| async move {
                let object_id = object.object_id().map(str::to_string);
                if options.is_cancelled() {
                    return (index, object_id, ItemResult::Cancelled);
                }
                let result = self.decide_prepared(prepared, object).await;
                (index, object_id, ItemResult::Finished(result))
            })
            .buffer_unordered(self.concurrency());

        let mut report = BatchReport::default();
        while let Some((index, object_id, result)) = results.next().await {
            record(&mut report, index, scenario_id, object_id, result);
        }

        let summary = &report.summary;
        tracing::info!(
            "Batch for scenario {} done: {} total, {} approved, {} review, \
             {} block and review, {} declined, {} skipped, {} errored, {} cancelled",
            scenario_id,
            summary.total,
            summary.approved,
            summary.review,
            summary.block_and_review,
            summary.declined,
            summary.skipped,
            summary.errored,
            summary.cancelled
        );
        Ok(report)
    }

    pub async fn get_decision(&self, organization_id: &str, decision_id: &str) -> Result<Decision> {
        Ok(self
            .repository
            .get_decision(organization_id, decision_id)
            .await?)
    }

    pub async fn list_decisions(
        &self,
        organization_id: &str,
        scenario_id: Option<&str>,
    ) -> Result<Vec<Decision>> {
        Ok(self
            .repository
            .list_decisions(organization_id, scenario_id)
            .await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn concurrency(&self) -> usize {
        self.config.max_concurrency.max(1)
    }

    async fn load_data_model(&self, organization_id: &str) -> Result<Arc<DataModel>> {
        Ok(Arc::new(
            self.repository.get_data_model(organization_id).await?,
        ))
    }

    /// Fetch the live iteration of a scenario; `None` when nothing is live
    async fn prepare(
        &self,
        scenario: Scenario,
        data_model: Arc<DataModel>,
    ) -> Result<Option<PreparedScenario>> {
        let Some(iteration_id) = self
            .repository
            .live_iteration_id(&scenario.organization_id, &scenario.id)
            .await?
        else {
            tracing::debug!("Scenario {} has no live iteration", scenario.id);
            return Ok(None);
        };

        let iteration = self
            .repository
            .get_iteration(&scenario.organization_id, &iteration_id)
            .await?;

        Ok(Some(PreparedScenario {
            scenario,
            iteration,
            data_model,
        }))
    }

    async fn decide_prepared(
        &self,
        prepared: &PreparedScenario,
        object: ClientObject,
    ) -> Result<DecisionAttempt> {
        let PreparedScenario {
            scenario,
            iteration,
            data_model,
        } = prepared;

        if object.table_name != scenario.trigger_object_table {
            return Err(SdkError::InvalidRequest(format!(
                "scenario {} is triggered by table '{}', got an object of '{}'",
                scenario.id, scenario.trigger_object_table, object.table_name
            )));
        }

        let mut ctx = EvaluationContext::new(
            scenario.organization_id.clone(),
            object,
            data_model.clone(),
            self.record_accessor.clone(),
        );
        if !self.config.memoize_accessors {
            ctx = ctx.without_memoization();
        }

        let Some(evaluation) = self
            .orchestrator
            .run(iteration, scenario.review_mode, &ctx)
            .await?
        else {
            return Ok(DecisionAttempt::TriggerNotMatched);
        };

        let decision = Decision {
            id: Uuid::new_v4().to_string(),
            organization_id: scenario.organization_id.clone(),
            scenario_id: scenario.id.clone(),
            scenario_iteration_id: iteration.id.clone(),
            scenario_version: iteration.version.unwrap_or_default(),
            score: evaluation.score,
            outcome: evaluation.outcome,
            review_status: evaluation.review_status,
            rule_executions: evaluation.rule_executions,
            trigger_object: ctx.into_trigger_object(),
            error: evaluation.error,
            created_at: Utc::now(),
        };

        self.repository.store_decision(decision.clone()).await?;

        if let Some(error) = &decision.error {
            tracing::warn!("Decision {} is incomplete: {}", decision.id, error.message);
        }
        tracing::info!(
            "Decision {} for scenario {} (v{}): score {} -> {}",
            decision.id,
            decision.scenario_id,
            decision.scenario_version,
            decision.score,
            decision.outcome
        );

        notify_all(&self.observers, &decision).await;
        Ok(DecisionAttempt::Decided(decision))
    }
}

fn record(
    report: &mut BatchReport,
    index: usize,
    scenario_id: &str,
    object_id: Option<String>,
    result: ItemResult,
) {
    match result {
        ItemResult::Cancelled => report.summary.record_cancelled(),
        ItemResult::Finished(Ok(DecisionAttempt::TriggerNotMatched)) => {
            report.summary.record_skipped()
        }
        ItemResult::Finished(Ok(DecisionAttempt::Decided(decision))) => {
            report.summary.record_decision(&decision);
            report.decisions.push(decision);
        }
        ItemResult::Finished(Err(e)) => {
            tracing::warn!(
                "No decision for object {:?} on scenario {}: {}",
                object_id,
                scenario_id,
                e
            );
            report.summary.record_failure();
            report.failures.push(BatchFailure {
                index,
                scenario_id: scenario_id.to_string(),
                object_id,
                message: e.to_string(),
            });
        }
    }
}
