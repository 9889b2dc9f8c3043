//! Arithmetic function execution

use crate::error::{EvalError, Result};
use arbiter_core::ast::{Function, ParamType};
use arbiter_core::Value;

/// Execute Add, Subtract, Multiply or Divide
///
/// Two Ints stay Int with checked arithmetic. Any Float operand widens the
/// other side. Divide always produces a Float.
pub(super) fn execute_binary(function: Function, left: &Value, right: &Value) -> Result<Value> {
    if let (Value::Int(l), Value::Int(r)) = (left, right) {
        let result = match function {
            Function::Add => Some(l.checked_add(*r)),
            Function::Subtract => Some(l.checked_sub(*r)),
            Function::Multiply => Some(l.checked_mul(*r)),
            _ => None,
        };
        if let Some(result) = result {
            return result
                .map(Value::Int)
                .ok_or(EvalError::ArithmeticOverflow(function));
        }
    }

    let (l, r) = as_floats(function, left, right)?;
    let result = match function {
        Function::Add => l + r,
        Function::Subtract => l - r,
        Function::Divide if r == 0.0 => return Err(EvalError::DivisionByZero),
        Function::Divide => l / r,
        _ => l * r,
    };
    if result.is_finite() {
        Ok(Value::Float(result))
    } else {
        Err(EvalError::ArithmeticOverflow(function))
    }
}

pub(super) fn execute_abs(value: &Value) -> Result<Value> {
    match value {
        Value::Int(i) => i
            .checked_abs()
            .map(Value::Int)
            .ok_or(EvalError::ArithmeticOverflow(Function::Abs)),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(EvalError::type_mismatch(Function::Abs, 0, ParamType::Number, other)),
    }
}

fn as_floats(function: Function, left: &Value, right: &Value) -> Result<(f64, f64)> {
    let l = left
        .as_f64()
        .ok_or_else(|| EvalError::type_mismatch(function, 0, ParamType::Number, left))?;
    let r = right
        .as_f64()
        .ok_or_else(|| EvalError::type_mismatch(function, 1, ParamType::Number, right))?;
    Ok((l, r))
}
