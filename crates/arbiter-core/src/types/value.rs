//! Runtime value types for Arbiter expressions
//!
//! The `Value` enum is the tagged union every typed record field and every
//! expression result is expressed in. Int and Float are distinct variants;
//! widening only happens inside the functions that declare it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Runtime value type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Null value (absent or JSON null field)
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// String value
    String(String),
    /// UTC timestamp
    Timestamp(DateTime<Utc>),
    /// Homogeneous or mixed list, produced by list constants
    List(Vec<Value>),
}

impl Value {
    /// Name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view of the value, widening Int to Float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Equality with Int/Float widening. Used by membership checks and
    /// record lookups where `5` and `5.0` denote the same key.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Value::List(left), Value::List(right)) => {
                left.len() == right.len()
                    && left.iter().zip(right).all(|(l, r)| l.loosely_equals(r))
            }
            _ => self == other,
        }
    }

    /// Canonical string for keying caches. Null and lists are not keys.
    pub fn lookup_key(&self) -> Option<String> {
        match self {
            Value::Null | Value::List(_) => None,
            Value::Bool(b) => Some(format!("b:{b}")),
            Value::Int(i) => Some(format!("n:{i}")),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Some(format!("n:{}", *f as i64))
            }
            Value::Float(f) => Some(format!("n:{f}")),
            Value::String(s) => Some(format!("s:{s}")),
            Value::Timestamp(t) => Some(format!("t:{}", t.to_rfc3339())),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_int_and_float_are_distinct() {
        assert_ne!(Value::Int(5), Value::Float(5.0));
        assert!(Value::Int(5).loosely_equals(&Value::Float(5.0)));
        assert!(!Value::Int(5).loosely_equals(&Value::String("5".to_string())));
    }

    #[test]
    fn test_as_f64_widens_int() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Bool(true).as_f64(), None);
    }

    #[test]
    fn test_lookup_key() {
        assert_eq!(Value::Int(7).lookup_key(), Value::Float(7.0).lookup_key());
        assert_ne!(
            Value::Int(7).lookup_key(),
            Value::String("7".to_string()).lookup_key()
        );
        assert_eq!(Value::Null.lookup_key(), None);
    }

    #[test]
    fn test_value_serde_keeps_variant() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        for value in [
            Value::Null,
            Value::Int(42),
            Value::Float(42.0),
            Value::Timestamp(ts),
            Value::List(vec![Value::from("FR"), Value::Int(1)]),
        ] {
            let json = serde_json::to_string(&value).unwrap();
            let back: Value = serde_json::from_str(&json).unwrap();
            assert_eq!(back, value);
        }
    }
}
