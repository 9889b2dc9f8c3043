//! Arbiter Core - Core types and definitions for the Arbiter decision engine
//!
//! This crate provides the fundamental types used across the Arbiter workspace:
//! - Typed values and the per-organization data model
//! - The payload validator turning raw JSON into typed client objects
//! - AST (expression tree) definitions and the function catalog
//! - Scenarios, iterations, publications and decisions

pub mod ast;
pub mod decision;
pub mod publication;
pub mod scenario;
pub mod types;

// Re-export commonly used types
pub use ast::{Function, FunctionCatalog, Node};
pub use decision::{
    Decision, DecisionError, ExecutionErrorKind, Outcome, ReviewStatus, RuleExecution,
    RuleExecutionError, RuleOutcome,
};
pub use publication::{replay_live_iteration, PublicationAction, ScenarioPublication};
pub use scenario::{IterationState, ReviewMode, Rule, Scenario, ScenarioIteration};
pub use types::{ClientObject, DataModel, DataType, PayloadError, PayloadParser, Table, Value};
