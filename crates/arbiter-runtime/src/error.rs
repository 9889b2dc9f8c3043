//! Runtime error types

use arbiter_core::ast::{Arity, Function, ParamType};
use arbiter_core::decision::{ExecutionErrorKind, RuleExecutionError};
use thiserror::Error;

/// Evaluation error, scoped to one node of an expression tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Wrong number of children for the function
    #[error("{function} expects {expected} arguments, got {actual}")]
    ArityMismatch {
        function: Function,
        expected: Arity,
        actual: usize,
    },

    /// Argument of the wrong type
    #[error("{function} argument {position} expects {expected}, got {actual}")]
    TypeMismatch {
        function: Function,
        position: usize,
        expected: ParamType,
        actual: &'static str,
    },

    /// Condition that did not produce a boolean
    #[error("Condition must evaluate to bool, got {actual}")]
    NotBoolean { actual: &'static str },

    /// Null passed where the function does not accept it
    #[error("{function} argument {position} is null")]
    NullOperand { function: Function, position: usize },

    /// Division by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Integer or time arithmetic out of range
    #[error("Arithmetic overflow in {0}")]
    ArithmeticOverflow(Function),

    /// Function missing from the catalog
    #[error("Unknown function: {0}")]
    UnknownFunction(Function),

    /// Table, field or link missing from the data model
    #[error("Accessor not found: {0}")]
    AccessorNotFound(String),

    /// Related record lookup failed
    #[error("Record lookup failed: {0}")]
    Infrastructure(String),
}

impl EvalError {
    /// Category recorded on rule executions
    pub fn kind(&self) -> ExecutionErrorKind {
        match self {
            EvalError::ArityMismatch { .. } => ExecutionErrorKind::ArityMismatch,
            EvalError::TypeMismatch { .. } | EvalError::NotBoolean { .. } => {
                ExecutionErrorKind::TypeMismatch
            }
            EvalError::NullOperand { .. } => ExecutionErrorKind::NullOperand,
            EvalError::DivisionByZero => ExecutionErrorKind::DivisionByZero,
            EvalError::ArithmeticOverflow(_) => ExecutionErrorKind::ArithmeticOverflow,
            EvalError::UnknownFunction(_) => ExecutionErrorKind::UnknownFunction,
            EvalError::AccessorNotFound(_) => ExecutionErrorKind::AccessorNotFound,
            EvalError::Infrastructure(_) => ExecutionErrorKind::Infrastructure,
        }
    }

    pub fn is_infrastructure(&self) -> bool {
        matches!(self, EvalError::Infrastructure(_))
    }

    pub(crate) fn type_mismatch(
        function: Function,
        position: usize,
        expected: ParamType,
        actual: &arbiter_core::Value,
    ) -> Self {
        EvalError::TypeMismatch {
            function,
            position,
            expected,
            actual: actual.type_name(),
        }
    }
}

impl From<EvalError> for RuleExecutionError {
    fn from(error: EvalError) -> Self {
        RuleExecutionError {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Failure of the record store backing database accessors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessError {
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    #[error("Lookup on {table}.{field} failed: {message}")]
    Lookup {
        table: String,
        field: String,
        message: String,
    },
}

impl From<AccessError> for EvalError {
    fn from(error: AccessError) -> Self {
        EvalError::Infrastructure(error.to_string())
    }
}

/// Result type for evaluation
pub type Result<T> = std::result::Result<T, EvalError>;
