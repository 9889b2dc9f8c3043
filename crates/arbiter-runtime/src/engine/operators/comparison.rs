//! Comparison and membership execution

use crate::error::{EvalError, Result};
use arbiter_core::ast::{Function, ParamType};
use arbiter_core::Value;
use std::cmp::Ordering;

/// Execute Greater, GreaterOrEqual, Less or LessOrEqual
pub(super) fn execute_ordering(function: Function, left: &Value, right: &Value) -> Result<Value> {
    let ordering = match (left, right) {
        (Value::Timestamp(l), Value::Timestamp(r)) => Some(l.cmp(r)),
        (Value::Int(l), Value::Int(r)) => Some(l.cmp(r)),
        (l, r) if l.is_numeric() && r.is_numeric() => {
            let (l, r) = (l.as_f64().unwrap_or_default(), r.as_f64().unwrap_or_default());
            l.partial_cmp(&r)
        }
        (Value::Timestamp(_), other) => {
            return Err(EvalError::type_mismatch(function, 1, ParamType::Timestamp, other))
        }
        (_, other) => return Err(EvalError::type_mismatch(function, 1, ParamType::Number, other)),
    };

    // NaN compares false
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };

    let result = match function {
        Function::Greater => ordering == Ordering::Greater,
        Function::GreaterOrEqual => ordering != Ordering::Less,
        Function::Less => ordering == Ordering::Less,
        _ => ordering != Ordering::Greater,
    };
    Ok(Value::Bool(result))
}

/// Equality for Equal and NotEqual
///
/// Null equals only null. Int and Float compare by numeric value; other
/// values must share a type.
pub(super) fn execute_equal(function: Function, left: &Value, right: &Value) -> Result<bool> {
    match (left, right) {
        (Value::Null, Value::Null) => Ok(true),
        (Value::Null, _) | (_, Value::Null) => Ok(false),
        (l, r) if l.is_numeric() && r.is_numeric() => Ok(l.loosely_equals(r)),
        (l, r) if l.type_name() == r.type_name() => Ok(l.loosely_equals(r)),
        (l, r) => Err(EvalError::TypeMismatch {
            function,
            position: 1,
            expected: ParamType::of_value(l).unwrap_or(ParamType::Any),
            actual: r.type_name(),
        }),
    }
}

pub(super) fn is_in_list(value: &Value, list: &Value) -> bool {
    list.as_list()
        .map(|items| items.iter().any(|item| item.loosely_equals(value)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_numeric_ordering_widens() {
        assert_eq!(
            execute_ordering(Function::Greater, &Value::Int(15000), &Value::Int(10000)),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            execute_ordering(Function::LessOrEqual, &Value::Int(3), &Value::Float(3.0)),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            execute_ordering(Function::Less, &Value::Float(2.5), &Value::Int(2)),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn test_timestamp_ordering() {
        let now = Utc::now();
        let earlier = now - Duration::hours(1);
        assert_eq!(
            execute_ordering(
                Function::GreaterOrEqual,
                &Value::Timestamp(now),
                &Value::Timestamp(earlier)
            ),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn test_number_against_timestamp() {
        let result = execute_ordering(
            Function::Greater,
            &Value::Int(1),
            &Value::Timestamp(Utc::now()),
        );
        assert!(matches!(result, Err(EvalError::TypeMismatch { position: 1, .. })));
    }

    #[test]
    fn test_equality() {
        assert_eq!(execute_equal(Function::Equal, &Value::Null, &Value::Null), Ok(true));
        assert_eq!(execute_equal(Function::Equal, &Value::Null, &Value::Int(1)), Ok(false));
        assert_eq!(execute_equal(Function::Equal, &Value::Int(1), &Value::Float(1.0)), Ok(true));
        assert_eq!(
            execute_equal(Function::Equal, &Value::from("EUR"), &Value::from("EUR")),
            Ok(true)
        );
        assert!(execute_equal(Function::Equal, &Value::from("1"), &Value::Int(1)).is_err());
    }

    #[test]
    fn test_membership() {
        let list = Value::List(vec![Value::from("FR"), Value::Int(3)]);
        assert!(is_in_list(&Value::from("FR"), &list));
        assert!(is_in_list(&Value::Float(3.0), &list));
        assert!(!is_in_list(&Value::from("fr"), &list));
    }
}
