//! Rule & trigger orchestration for one trigger object
//!
//! An attempt goes through four steps: the trigger check, the rule pass in
//! display order, scoring and classification. A trigger that is false, null
//! or fails to evaluate ends the attempt without running any rule. A failing
//! rule is recorded on its own execution and the pass continues.

use crate::classification::{classify, initial_review_status, total_score};
use crate::error::{Result, SdkError};
use arbiter_core::{
    DecisionError, ExecutionErrorKind, Outcome, ReviewMode, ReviewStatus, RuleExecution,
    ScenarioIteration,
};
use arbiter_runtime::{EvaluationContext, Evaluator, ValidationError};

/// Scored and classified rule pass
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Evaluation {
    pub score: i32,
    pub outcome: Outcome,
    pub review_status: Option<ReviewStatus>,
    pub rule_executions: Vec<RuleExecution>,
    pub error: Option<DecisionError>,
}

#[derive(Debug, Clone)]
pub(crate) struct RuleOrchestrator {
    evaluator: Evaluator,
}

impl RuleOrchestrator {
    pub fn new(evaluator: Evaluator) -> Self {
        Self { evaluator }
    }

    /// Run an iteration against the object held by `ctx`
    ///
    /// Returns `None` when the trigger does not match. Infrastructure failures
    /// while checking the trigger are returned as errors.
    pub async fn run(
        &self,
        iteration: &ScenarioIteration,
        review_mode: ReviewMode,
        ctx: &EvaluationContext,
    ) -> Result<Option<Evaluation>> {
        let (Some(review_threshold), Some(reject_threshold)) = (
            iteration.score_review_threshold,
            iteration.score_reject_threshold,
        ) else {
            return Err(SdkError::Validation(vec![ValidationError::MissingThresholds]));
        };

        if !self.trigger_matches(iteration, ctx).await? {
            return Ok(None);
        }

        let rule_executions = self.rule_pass(iteration, ctx).await;

        let score = total_score(&rule_executions);
        let outcome = classify(score, review_threshold, reject_threshold, review_mode);
        let error = infrastructure_error(&rule_executions);

        tracing::debug!(
            "Iteration {} scored {} -> {} ({} rules)",
            iteration.id,
            score,
            outcome,
            rule_executions.len()
        );

        Ok(Some(Evaluation {
            score,
            outcome,
            review_status: initial_review_status(outcome),
            rule_executions,
            error,
        }))
    }

    async fn trigger_matches(
        &self,
        iteration: &ScenarioIteration,
        ctx: &EvaluationContext,
    ) -> Result<bool> {
        let Some(trigger) = &iteration.trigger_condition else {
            tracing::warn!("Iteration {} has no trigger condition", iteration.id);
            return Ok(false);
        };

        match self.evaluator.evaluate_condition(trigger, ctx).await {
            Ok(matched) => {
                tracing::debug!("Trigger of iteration {} matched: {}", iteration.id, matched);
                Ok(matched)
            }
            Err(e) if e.is_infrastructure() => Err(SdkError::Infrastructure(e.to_string())),
            Err(e) => {
                tracing::warn!(
                    "Trigger of iteration {} failed, treated as not matched: {}",
                    iteration.id,
                    e
                );
                Ok(false)
            }
        }
    }

    async fn rule_pass(
        &self,
        iteration: &ScenarioIteration,
        ctx: &EvaluationContext,
    ) -> Vec<RuleExecution> {
        let mut executions = Vec::with_capacity(iteration.rules.len());

        for rule in iteration.ordered_rules() {
            let execution = match self.evaluator.evaluate_condition(&rule.formula, ctx).await {
                Ok(result) => RuleExecution::evaluated(
                    rule.id.clone(),
                    rule.name.clone(),
                    rule.score_modifier,
                    result,
                ),
                Err(e) => {
                    tracing::warn!("Rule '{}' ({}) failed: {}", rule.name, rule.id, e);
                    RuleExecution::failed(
                        rule.id.clone(),
                        rule.name.clone(),
                        rule.score_modifier,
                        e.into(),
                    )
                }
            };
            executions.push(execution);
        }

        executions
    }
}

fn infrastructure_error(executions: &[RuleExecution]) -> Option<DecisionError> {
    let failed: Vec<&RuleExecution> = executions
        .iter()
        .filter(|e| {
            e.error
                .as_ref()
                .is_some_and(|err| err.kind == ExecutionErrorKind::Infrastructure)
        })
        .collect();

    let first = failed.first()?.error.as_ref()?;
    Some(DecisionError {
        message: format!(
            "{} rule(s) could not be evaluated: {}",
            failed.len(),
            first.message
        ),
        rule_ids: failed.iter().map(|e| e.rule_id.clone()).collect(),
    })
}
