//! Expression evaluation engine

mod evaluator;
mod operators;

pub use evaluator::Evaluator;
