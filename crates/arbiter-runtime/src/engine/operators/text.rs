//! String and emptiness execution
//!
//! Substring matching is case-insensitive.

use crate::error::{EvalError, Result};
use arbiter_core::ast::{Function, ParamType};
use arbiter_core::Value;

pub(super) fn contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack.as_str(), needle.as_str()) {
        (Some(h), Some(n)) => h.to_lowercase().contains(&n.to_lowercase()),
        _ => false,
    }
}

/// Whether `haystack` contains any string of `needles`
pub(super) fn contains_any_of(
    function: Function,
    haystack: &Value,
    needles: &Value,
) -> Result<bool> {
    let haystack = haystack.as_str().unwrap_or_default().to_lowercase();
    let items = needles.as_list().unwrap_or_default();
    for item in items {
        let needle = item
            .as_str()
            .ok_or_else(|| EvalError::type_mismatch(function, 1, ParamType::String, item))?;
        if haystack.contains(&needle.to_lowercase()) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Null, blank strings and empty lists are empty
pub(super) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::List(items) => items.is_empty(),
        _ => false,
    }
}
