//! DecisionEngine - Main API for producing decisions
//!
//! # Architecture
//!
//! The module is organized into:
//! - `types`: attempt, batch options and batch report types
//! - `orchestrator`: trigger check, rule pass, scoring and classification for one object
//! - `observer`: hooks invoked after a decision is stored
//! - `engine`: the `DecisionEngine` itself (payload parsing, single, create-all and batch)

mod engine;
mod observer;
mod orchestrator;
mod types;

pub use engine::DecisionEngine;
pub use observer::DecisionObserver;
pub use types::{BatchFailure, BatchOptions, BatchReport, BatchSummary, DecisionAttempt};
