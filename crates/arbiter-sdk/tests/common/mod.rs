//! Shared fixtures for SDK integration tests

#![allow(dead_code)]

use arbiter_core::types::{DataType, Field, Table};
use arbiter_core::{
    ClientObject, DataModel, Function, Node, ReviewMode, Scenario, ScenarioIteration, Value,
};
use arbiter_repository::{DataModelRepository, MemoryRepository, ScenarioRepository};
use arbiter_runtime::{AccessError, InMemoryRecordStore, RecordAccessor};
use arbiter_sdk::{
    DecisionEngine, DecisionEngineBuilder, NewIteration, NewRule, NewScenario, ScenarioVersioning,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const ORG: &str = "org";

pub fn data_model() -> DataModel {
    DataModel::new()
        .with_table(
            Table::new("accounts")
                .with_field(Field::new("risk_level", DataType::Int).nullable())
                .with_field(Field::new("status", DataType::String).nullable()),
        )
        .with_table(
            Table::new("transactions")
                .with_field(Field::new("amount", DataType::Int))
                .with_field(Field::new("fee", DataType::Int).nullable())
                .with_field(Field::new("counterparty", DataType::String).nullable())
                .with_field(Field::new("account_id", DataType::String).nullable())
                .with_link("account", "accounts", "object_id", "account_id"),
        )
}

pub fn record(table: &str, fields: &[(&str, Value)]) -> ClientObject {
    let mut data: BTreeMap<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    data.entry("updated_at".to_string())
        .or_insert_with(|| Value::Timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
    ClientObject::new(table, data)
}

pub fn transaction(id: &str, amount: i64) -> ClientObject {
    record(
        "transactions",
        &[
            ("object_id", Value::from(id)),
            ("amount", Value::Int(amount)),
            ("fee", Value::Int(0)),
            ("counterparty", Value::Null),
            ("account_id", Value::Null),
        ],
    )
}

pub fn transaction_on_account(id: &str, amount: i64, account_id: &str) -> ClientObject {
    let mut object = transaction(id, amount);
    object
        .data
        .insert("account_id".to_string(), Value::from(account_id));
    object
}

/// `field > value`
pub fn greater(field: &str, value: i64) -> Node {
    Node::call(
        Function::Greater,
        vec![Node::payload(field), Node::constant(value)],
    )
}

/// `amount / fee > 1`, failing with division by zero on the fixture transactions
pub fn divides_by_fee() -> Node {
    Node::call(
        Function::Greater,
        vec![
            Node::call(
                Function::Divide,
                vec![Node::payload("amount"), Node::payload("fee")],
            ),
            Node::constant(1i64),
        ],
    )
}

/// `account.risk_level >= value`
pub fn account_risk_at_least(value: i64) -> Node {
    Node::call(
        Function::GreaterOrEqual,
        vec![
            Node::database("transactions", vec!["account".to_string()], "risk_level"),
            Node::constant(value),
        ],
    )
}

pub struct Fixture {
    pub repository: Arc<MemoryRepository>,
    pub records: Arc<InMemoryRecordStore>,
    pub engine: DecisionEngine,
    pub versioning: ScenarioVersioning,
}

impl Fixture {
    /// Iteration as stored, bypassing the versioning API
    pub async fn repository_iteration(&self, iteration_id: &str) -> ScenarioIteration {
        self.repository.get_iteration(ORG, iteration_id).await.unwrap()
    }
}

pub async fn fixture() -> Fixture {
    fixture_with(|builder| builder).await
}

/// Fixture whose engine builder is customized by `configure`
///
/// The builder already carries the repository and the record store; a
/// `with_record_accessor` call in `configure` replaces the store.
pub async fn fixture_with(
    configure: impl FnOnce(DecisionEngineBuilder) -> DecisionEngineBuilder,
) -> Fixture {
    let repository = Arc::new(MemoryRepository::new());
    repository.save_data_model(ORG, data_model()).await.unwrap();

    let records = Arc::new(InMemoryRecordStore::new());
    records
        .upsert(
            ORG,
            record(
                "accounts",
                &[
                    ("object_id", Value::from("acc-risky")),
                    ("risk_level", Value::Int(5)),
                    ("status", Value::from("open")),
                ],
            ),
        )
        .await
        .unwrap();

    let builder = DecisionEngineBuilder::new()
        .with_repository(repository.clone())
        .with_record_accessor(records.clone());
    let engine = configure(builder).build().await.unwrap();
    let versioning = engine.versioning();

    Fixture {
        repository,
        records,
        engine,
        versioning,
    }
}

/// Iteration content with a trigger, rules and thresholds
pub fn iteration(trigger: Node, rules: Vec<NewRule>, review: i32, reject: i32) -> NewIteration {
    NewIteration {
        trigger_condition: Some(trigger),
        rules,
        score_review_threshold: Some(review),
        score_reject_threshold: Some(reject),
        schedule: None,
    }
}

/// Create a transactions scenario and publish a committed iteration of it
pub async fn live_scenario(
    fixture: &Fixture,
    review_mode: ReviewMode,
    content: NewIteration,
) -> Scenario {
    let scenario = fixture
        .versioning
        .create_scenario(
            ORG,
            NewScenario::new("Transactions", "transactions").with_review_mode(review_mode),
        )
        .await
        .unwrap();
    let draft = fixture
        .versioning
        .create_draft(ORG, &scenario.id, content)
        .await
        .unwrap();
    fixture.versioning.commit(ORG, &draft.id).await.unwrap();
    fixture.versioning.publish(ORG, &draft.id).await.unwrap();
    scenario
}

/// The "high amount" scenario: `amount > 10000` scores 30, review at 20,
/// reject at 50
pub fn high_amount_rules() -> Vec<NewRule> {
    vec![NewRule::new("high amount", greater("amount", 10_000), 30)]
}

/// Record store that is always down
pub struct UnavailableStore;

#[async_trait]
impl RecordAccessor for UnavailableStore {
    async fn find_record(
        &self,
        _organization_id: &str,
        _table: &str,
        _field: &str,
        _value: &Value,
    ) -> Result<Option<ClientObject>, AccessError> {
        Err(AccessError::Unavailable("connection refused".to_string()))
    }
}
