//! Arbiter Runtime - Expression evaluation for the Arbiter decision engine
//!
//! This crate walks rule and trigger formulas against a typed trigger object,
//! resolving database accessors through a pluggable record store.

pub mod context;
pub mod engine;
pub mod error;
pub mod storage;
pub mod validation;

// Re-export main types
pub use context::EvaluationContext;
pub use engine::Evaluator;
pub use error::{AccessError, EvalError, Result};
pub use storage::{InMemoryRecordStore, RecordAccessor};
pub use validation::{IterationValidator, ValidationError};
