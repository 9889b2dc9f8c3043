//! Function implementations
//!
//! Arguments reaching these functions already satisfy the catalog signature:
//! arity is checked, nulls are rejected unless the function accepts them and
//! every non-null argument matches its declared parameter type. The
//! implementations only check what a signature cannot express, such as a
//! number compared with a timestamp.

mod arithmetic;
mod comparison;
mod logical;
mod temporal;
mod text;

use crate::error::{EvalError, Result};
use arbiter_core::ast::{Arity, Function};
use arbiter_core::Value;
use chrono::{DateTime, Utc};

/// Arity the implementation itself needs, whatever the catalog declares
fn intrinsic_arity(function: Function) -> Arity {
    match function {
        Function::TimeNow => Arity::Fixed(0),
        Function::Abs | Function::Not | Function::IsEmpty | Function::IsNotEmpty => Arity::Fixed(1),
        Function::And | Function::Or | Function::List => Arity::Variadic { min: 0 },
        _ => Arity::Fixed(2),
    }
}

/// Apply a non short-circuit function to evaluated arguments
pub(crate) fn apply(function: Function, args: Vec<Value>, now: DateTime<Utc>) -> Result<Value> {
    let expected = intrinsic_arity(function);
    if !expected.accepts(args.len()) {
        return Err(EvalError::ArityMismatch {
            function,
            expected,
            actual: args.len(),
        });
    }

    match function {
        Function::Add | Function::Subtract | Function::Multiply | Function::Divide => {
            arithmetic::execute_binary(function, &args[0], &args[1])
        }
        Function::Abs => arithmetic::execute_abs(&args[0]),

        Function::Greater
        | Function::GreaterOrEqual
        | Function::Less
        | Function::LessOrEqual => comparison::execute_ordering(function, &args[0], &args[1]),
        Function::Equal => comparison::execute_equal(function, &args[0], &args[1]).map(Value::Bool),
        Function::NotEqual => {
            comparison::execute_equal(function, &args[0], &args[1]).map(|eq| Value::Bool(!eq))
        }

        Function::And | Function::Or => logical::execute_all(function, &args),
        Function::Not => logical::execute_not(&args[0]),

        Function::List => Ok(Value::List(args)),
        Function::IsInList => Ok(Value::Bool(comparison::is_in_list(&args[0], &args[1]))),
        Function::IsNotInList => Ok(Value::Bool(!comparison::is_in_list(&args[0], &args[1]))),

        Function::StringContains => Ok(Value::Bool(text::contains(&args[0], &args[1]))),
        Function::StringNotContain => Ok(Value::Bool(!text::contains(&args[0], &args[1]))),
        Function::ContainsAnyOf => {
            text::contains_any_of(function, &args[0], &args[1]).map(Value::Bool)
        }
        Function::ContainsNoneOf => text::contains_any_of(function, &args[0], &args[1])
            .map(|any| Value::Bool(!any)),

        Function::IsEmpty => Ok(Value::Bool(text::is_empty(&args[0]))),
        Function::IsNotEmpty => Ok(Value::Bool(!text::is_empty(&args[0]))),

        Function::TimeNow => Ok(Value::Timestamp(now)),
        Function::TimeAdd => temporal::execute_time_add(function, &args[0], &args[1]),
    }
}
