//! Typed records

use super::schema::{OBJECT_ID_FIELD, UPDATED_AT_FIELD};
use super::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static NULL: Value = Value::Null;

/// A validated instance of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientObject {
    /// Table the record belongs to
    pub table_name: String,

    /// Field name to typed value; null is allowed for nullable fields
    pub data: BTreeMap<String, Value>,
}

impl ClientObject {
    pub fn new(table_name: impl Into<String>, data: BTreeMap<String, Value>) -> Self {
        Self {
            table_name: table_name.into(),
            data,
        }
    }

    /// Value of a field, `Null` when absent
    pub fn get(&self, field: &str) -> &Value {
        self.data.get(field).unwrap_or(&NULL)
    }

    pub fn object_id(&self) -> Option<&str> {
        self.get(OBJECT_ID_FIELD).as_str()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        match self.get(UPDATED_AT_FIELD) {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}
