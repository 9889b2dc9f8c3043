//! Arbiter SDK - High-level API for the Arbiter decision engine
//!
//! The SDK ties the pieces together:
//!
//! - [`DecisionEngine`] validates payloads, runs the live iteration of a
//!   scenario against a trigger object and stores the resulting decision,
//!   for one object, for every scenario of a table, or for a batch
//! - [`ScenarioVersioning`] manages drafts, commits and publication
//!
//! # Example
//!
//! ```rust,ignore
//! use arbiter_sdk::{DecisionEngineBuilder, DecisionAttempt};
//! use arbiter_repository::MemoryRepository;
//! use std::sync::Arc;
//!
//! let engine = DecisionEngineBuilder::new()
//!     .with_repository(Arc::new(MemoryRepository::new()))
//!     .build()?;
//!
//! let object = engine.parse_payload("org", "transactions", payload).await?;
//! match engine.create_decision("org", "scenario-id", object).await? {
//!     DecisionAttempt::Decided(decision) => println!("{}", decision.outcome),
//!     DecisionAttempt::TriggerNotMatched => {}
//! }
//! ```

pub mod builder;
pub mod classification;
pub mod config;
pub mod decision_engine;
pub mod error;
pub mod versioning;

pub use builder::DecisionEngineBuilder;
pub use config::EngineConfig;
pub use decision_engine::{
    BatchFailure, BatchOptions, BatchReport, BatchSummary, DecisionAttempt, DecisionEngine,
    DecisionObserver,
};
pub use error::{Result, SdkError};
pub use versioning::{IterationUpdate, NewIteration, NewRule, NewScenario, ScenarioVersioning};

// Re-export core types
pub use arbiter_core::{
    ClientObject, DataModel, Decision, Node, Outcome, ReviewMode, Rule, RuleExecution, Scenario,
    ScenarioIteration, Value,
};
pub use arbiter_runtime::{InMemoryRecordStore, RecordAccessor};
