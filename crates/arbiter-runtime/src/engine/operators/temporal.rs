//! Time function execution

use crate::error::{EvalError, Result};
use arbiter_core::ast::{Function, ParamType};
use arbiter_core::Value;
use chrono::TimeDelta;

/// Shift a timestamp by a number of seconds, negative to go back
pub(super) fn execute_time_add(
    function: Function,
    timestamp: &Value,
    seconds: &Value,
) -> Result<Value> {
    let Value::Timestamp(ts) = timestamp else {
        return Err(EvalError::type_mismatch(function, 0, ParamType::Timestamp, timestamp));
    };
    let Value::Int(seconds) = seconds else {
        return Err(EvalError::type_mismatch(function, 1, ParamType::Int, seconds));
    };

    TimeDelta::try_seconds(*seconds)
        .and_then(|delta| ts.checked_add_signed(delta))
        .map(Value::Timestamp)
        .ok_or(EvalError::ArithmeticOverflow(function))
}
