//! Boolean function execution

use crate::error::{EvalError, Result};
use arbiter_core::ast::{Function, ParamType};
use arbiter_core::Value;

pub(super) fn execute_not(value: &Value) -> Result<Value> {
    value
        .as_bool()
        .map(|b| Value::Bool(!b))
        .ok_or_else(|| EvalError::type_mismatch(Function::Not, 0, ParamType::Bool, value))
}

/// And / Or over already evaluated operands
///
/// The evaluator normally short-circuits these; this path serves catalogs
/// that declare them eager.
pub(super) fn execute_all(function: Function, args: &[Value]) -> Result<Value> {
    let mut result = function == Function::And;
    for (position, arg) in args.iter().enumerate() {
        let b = arg
            .as_bool()
            .ok_or_else(|| EvalError::type_mismatch(function, position, ParamType::Bool, arg))?;
        result = if function == Function::And { result && b } else { result || b };
    }
    Ok(Value::Bool(result))
}
