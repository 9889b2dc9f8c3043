//! Payload validation against a table definition
//!
//! `PayloadParser::parse` turns raw JSON bytes into a [`ClientObject`]. Every
//! declared field is checked; all field errors are collected and returned
//! together, and no partially populated object is ever produced.

use super::object::ClientObject;
use super::schema::{
    DataType, Field, Table, MANDATORY_FIELDS, OBJECT_ID_FIELD, UPDATED_AT_FIELD,
};
use super::value::Value;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Naive formats accepted for timestamps, interpreted as UTC
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// How fields absent from the table definition are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Unknown fields are dropped
    #[default]
    Ignore,
    /// Unknown fields are reported as field errors
    Reject,
}

/// Field name to error message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Payload parsing error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    /// The bytes are not valid JSON
    #[error("Malformed JSON payload: {0}")]
    MalformedJson(String),

    /// The JSON document is not an object
    #[error("Payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// One or more fields failed validation
    #[error("Invalid payload fields: {0}")]
    InvalidFields(FieldErrors),
}

impl PayloadError {
    /// Field errors, if this is a field-level failure
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            PayloadError::InvalidFields(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Parser for raw payloads
#[derive(Debug, Clone, Default)]
pub struct PayloadParser {
    strictness: Strictness,
}

impl PayloadParser {
    /// Create a parser that ignores unknown fields
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Parse raw bytes into a typed record of `table`
    pub fn parse(&self, table: &Table, raw: &[u8]) -> Result<ClientObject, PayloadError> {
        let json: serde_json::Value = serde_json::from_slice(raw)
            .map_err(|e| PayloadError::MalformedJson(e.to_string()))?;
        self.parse_json(table, &json)
    }

    /// Validate an already decoded JSON document
    pub fn parse_json(
        &self,
        table: &Table,
        json: &serde_json::Value,
    ) -> Result<ClientObject, PayloadError> {
        let object = match json {
            serde_json::Value::Object(object) => object,
            other => return Err(PayloadError::NotAnObject(json_type_name(other))),
        };

        let mut errors = FieldErrors::default();
        let mut data = BTreeMap::new();

        // Mandatory fields keep their fixed type even when the table
        // declares them differently or not at all
        let mandatory = mandatory_fields();
        let declared = table
            .fields
            .iter()
            .filter(|(name, _)| !MANDATORY_FIELDS.contains(&name.as_str()))
            .map(|(name, field)| (name.as_str(), field));
        let fields = mandatory
            .iter()
            .map(|field| (field.name.as_str(), field))
            .chain(declared);

        for (name, field) in fields {
            match object.get(name) {
                None | Some(serde_json::Value::Null) => {
                    if field.nullable {
                        data.insert(name.to_string(), Value::Null);
                    } else {
                        errors.insert(name, "field is required and not nullable");
                    }
                }
                Some(raw) => match decode_field(field, raw) {
                    Ok(value) => {
                        data.insert(name.to_string(), value);
                    }
                    Err(message) => errors.insert(name, message),
                },
            }
        }

        if self.strictness == Strictness::Reject {
            for name in object.keys() {
                if !table.fields.contains_key(name) && !MANDATORY_FIELDS.contains(&name.as_str()) {
                    errors.insert(name.clone(), "unknown field");
                }
            }
        }

        if !errors.is_empty() {
            return Err(PayloadError::InvalidFields(errors));
        }

        Ok(ClientObject::new(table.name.clone(), data))
    }
}

fn mandatory_fields() -> [Field; 2] {
    [
        Field::new(OBJECT_ID_FIELD, DataType::String),
        Field::new(UPDATED_AT_FIELD, DataType::Timestamp),
    ]
}

/// Decode one JSON value according to the field's data type
fn decode_field(field: &Field, raw: &serde_json::Value) -> Result<Value, String> {
    match field.data_type {
        DataType::Bool => raw.as_bool().map(Value::Bool).ok_or_else(|| mismatch(field, raw)),
        DataType::Int => decode_int(raw).ok_or_else(|| mismatch(field, raw)),
        DataType::Float => raw.as_f64().map(Value::Float).ok_or_else(|| mismatch(field, raw)),
        DataType::String => raw
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| mismatch(field, raw)),
        DataType::Timestamp => match raw {
            serde_json::Value::String(text) => parse_timestamp(text)
                .map(Value::Timestamp)
                .ok_or_else(|| format!("expected an RFC 3339 timestamp, got '{text}'")),
            serde_json::Value::Number(number) => number
                .as_i64()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(Value::Timestamp)
                .ok_or_else(|| format!("expected epoch seconds, got {number}")),
            _ => Err(mismatch(field, raw)),
        },
    }
}

/// Integers, or floats without a fractional part that fit in i64
fn decode_int(raw: &serde_json::Value) -> Option<Value> {
    let number = raw.as_number()?;
    if let Some(i) = number.as_i64() {
        return Some(Value::Int(i));
    }
    let f = number.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(Value::Int(f as i64))
    } else {
        None
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

fn mismatch(field: &Field, raw: &serde_json::Value) -> String {
    format!(
        "expected {}, got {}",
        field.data_type.type_name(),
        json_type_name(raw)
    )
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(n) if n.is_f64() => "float",
        serde_json::Value::Number(_) => "int",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
