//! Batch decisioning tests: bounded concurrency, cancellation and counters

mod common;

use arbiter_core::{ClientObject, Decision, Node, ReviewMode, Value};
use arbiter_runtime::{AccessError, RecordAccessor};
use arbiter_sdk::{BatchOptions, DecisionObserver, NewRule};
use async_trait::async_trait;
use common::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn transactions(count: usize, amount: i64) -> Vec<ClientObject> {
    (0..count)
        .map(|i| transaction(&format!("tx-{i}"), amount))
        .collect()
}

// =============================================================================
// Counters
// =============================================================================

#[tokio::test]
async fn test_batch_summary() {
    let f = fixture_with(|b| b.with_max_concurrency(4)).await;
    let mut rules = high_amount_rules();
    rules.push(
        NewRule::new("very high amount", greater("amount", 50_000), 25).with_display_order(1),
    );
    let scenario = live_scenario(
        &f,
        ReviewMode::Review,
        iteration(greater("amount", 100), rules, 20, 50),
    )
    .await;

    let mut objects = Vec::new();
    for (i, amount) in [10, 500, 15_000, 60_000, 20_000, 70_000].into_iter().enumerate() {
        objects.push(transaction(&format!("tx-{i}"), amount));
    }

    let report = f
        .engine
        .decide_batch(ORG, &scenario.id, objects, BatchOptions::new())
        .await
        .unwrap();

    let summary = report.summary;
    assert_eq!(summary.total, 6);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.approved, 1);
    assert_eq!(summary.review, 2);
    assert_eq!(summary.declined, 2);
    assert_eq!(summary.errored, 0);
    assert_eq!(summary.cancelled, 0);
    assert_eq!(report.decisions.len(), summary.decided());

    let ids: HashSet<&str> = report.decisions.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids.len(), report.decisions.len());
    assert_eq!(
        f.engine
            .list_decisions(ORG, Some(&scenario.id))
            .await
            .unwrap()
            .len(),
        5
    );
}

#[tokio::test]
async fn test_batch_counts_infrastructure_errors() {
    let f = fixture_with(|b| b.with_record_accessor(Arc::new(UnavailableStore))).await;
    let rules = vec![NewRule::new("risky account", account_risk_at_least(3), 40)];
    let scenario = live_scenario(
        &f,
        ReviewMode::Review,
        iteration(Node::constant(true), rules, 20, 50),
    )
    .await;

    let objects = vec![
        transaction_on_account("tx-1", 10, "acc-1"),
        transaction_on_account("tx-2", 10, "acc-2"),
        // No account: no lookup, the rule fails on its null operand instead
        transaction("tx-3", 10),
    ];
    let report = f
        .engine
        .decide_batch(ORG, &scenario.id, objects, BatchOptions::new())
        .await
        .unwrap();

    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.errored, 2);
    assert_eq!(report.decisions.len(), 3);
    assert_eq!(
        report.decisions.iter().filter(|d| d.error.is_some()).count(),
        2
    );
}

#[tokio::test]
async fn test_batch_for_unknown_scenario_fails() {
    let f = fixture().await;
    let result = f
        .engine
        .decide_batch(ORG, "missing", transactions(3, 10), BatchOptions::new())
        .await;
    assert!(result.is_err());
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancelled_before_start() {
    let f = fixture().await;
    let scenario = live_scenario(
        &f,
        ReviewMode::Review,
        iteration(Node::constant(true), high_amount_rules(), 20, 50),
    )
    .await;

    let token = CancellationToken::new();
    token.cancel();
    let report = f
        .engine
        .decide_batch(
            ORG,
            &scenario.id,
            transactions(5, 10),
            BatchOptions::new().with_cancellation(token),
        )
        .await
        .unwrap();

    assert_eq!(report.summary.total, 5);
    assert_eq!(report.summary.cancelled, 5);
    assert!(report.decisions.is_empty());
    assert!(f.engine.list_decisions(ORG, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expired_deadline() {
    let f = fixture().await;
    let scenario = live_scenario(
        &f,
        ReviewMode::Review,
        iteration(Node::constant(true), high_amount_rules(), 20, 50),
    )
    .await;

    let report = f
        .engine
        .decide_batch(
            ORG,
            &scenario.id,
            transactions(3, 10),
            BatchOptions::new().with_deadline(Instant::now()),
        )
        .await
        .unwrap();
    assert_eq!(report.summary.cancelled, 3);
}

/// Cancels its token on the first decision it sees
struct CancelOnDecision {
    token: CancellationToken,
}

#[async_trait]
impl DecisionObserver for CancelOnDecision {
    fn name(&self) -> &str {
        "cancel"
    }

    async fn on_decision(&self, _decision: &Decision) -> anyhow::Result<()> {
        self.token.cancel();
        Ok(())
    }
}

#[tokio::test]
async fn test_cancellation_lets_running_decision_finish() {
    let token = CancellationToken::new();
    let observer = Arc::new(CancelOnDecision {
        token: token.clone(),
    });
    let f = fixture_with(move |b| b.with_max_concurrency(1).add_observer(observer)).await;
    let scenario = live_scenario(
        &f,
        ReviewMode::Review,
        iteration(Node::constant(true), high_amount_rules(), 20, 50),
    )
    .await;

    let report = f
        .engine
        .decide_batch(
            ORG,
            &scenario.id,
            transactions(10, 15_000),
            BatchOptions::new().with_cancellation(token),
        )
        .await
        .unwrap();

    assert_eq!(report.summary.total, 10);
    assert_eq!(report.summary.decided(), 1);
    assert_eq!(report.summary.cancelled, 9);

    // The finished decision is complete
    let decision = &report.decisions[0];
    assert_eq!(decision.rule_executions.len(), 1);
    assert_eq!(decision.score, 30);
}

// =============================================================================
// Concurrency
// =============================================================================

/// Record store tracking how many lookups run at once
#[derive(Default)]
struct SlowStore {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl RecordAccessor for SlowStore {
    async fn find_record(
        &self,
        _organization_id: &str,
        _table: &str,
        _field: &str,
        _value: &Value,
    ) -> Result<Option<ClientObject>, AccessError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(None)
    }
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let store = Arc::new(SlowStore::default());
    let accessor = store.clone();
    let f = fixture_with(move |b| b.with_max_concurrency(3).with_record_accessor(accessor)).await;
    let rules = vec![NewRule::new("risky account", account_risk_at_least(3), 40)];
    let scenario = live_scenario(
        &f,
        ReviewMode::Review,
        iteration(Node::constant(true), rules, 20, 50),
    )
    .await;

    let objects = (0..12)
        .map(|i| transaction_on_account(&format!("tx-{i}"), 10, &format!("acc-{i}")))
        .collect();
    let report = f
        .engine
        .decide_batch(ORG, &scenario.id, objects, BatchOptions::new())
        .await
        .unwrap();

    assert_eq!(report.summary.total, 12);
    assert_eq!(report.decisions.len(), 12);
    let max = store.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 3, "{max} lookups ran at once");
    assert!(max >= 2, "batch ran sequentially");
}

#[tokio::test]
async fn test_engine_shared_across_tasks() {
    let f = fixture().await;
    let scenario = live_scenario(
        &f,
        ReviewMode::Review,
        iteration(Node::constant(true), high_amount_rules(), 20, 50),
    )
    .await;
    let engine = Arc::new(f.engine);

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        let scenario_id = scenario.id.clone();
        handles.push(tokio::spawn(async move {
            engine
                .create_decision(ORG, &scenario_id, transaction(&format!("tx-{i}"), 15_000))
                .await
        }));
    }
    for handle in handles {
        let attempt = handle.await.unwrap().unwrap();
        assert_eq!(attempt.decision().map(|d| d.score), Some(30));
    }
    assert_eq!(engine.list_decisions(ORG, None).await.unwrap().len(), 8);
}
