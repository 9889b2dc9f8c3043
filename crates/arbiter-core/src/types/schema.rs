//! Data model definitions
//!
//! An organization's data model is a set of dynamically defined tables. Each
//! table declares typed fields and single-record links to other tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Field that identifies a record inside its table
pub const OBJECT_ID_FIELD: &str = "object_id";

/// Field carrying the last modification time of a record
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// Fields every table carries regardless of its definition
pub const MANDATORY_FIELDS: [&str; 2] = [OBJECT_ID_FIELD, UPDATED_AT_FIELD];

/// Data type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Bool,
    Int,
    Float,
    String,
    Timestamp,
}

impl DataType {
    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Timestamp => "timestamp",
        }
    }
}

/// One typed column of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name, unique within its table
    pub name: String,

    /// Data type, fixed at creation
    pub data_type: DataType,

    /// Whether payloads may omit the field or send null
    #[serde(default)]
    pub nullable: bool,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Whether the field takes its values from a known set
    #[serde(default)]
    pub is_enum: bool,

    /// Candidate values collected for enum fields
    #[serde(default)]
    pub enum_values: Vec<super::Value>,
}

impl Field {
    /// Create a non-nullable field
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            description: None,
            is_enum: false,
            enum_values: Vec::new(),
        }
    }

    /// Mark the field nullable
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the field as an enum with candidate values
    pub fn with_enum_values(mut self, values: Vec<super::Value>) -> Self {
        self.is_enum = true;
        self.enum_values = values;
        self
    }
}

/// Link from a record to exactly one record of another table
///
/// A record of the owning table links to the record of `linked_table` whose
/// `parent_field` equals the owning record's `child_field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkToSingle {
    pub name: String,
    pub linked_table: String,
    pub parent_field: String,
    pub child_field: String,
}

/// One dynamically defined entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub fields: BTreeMap<String, Field>,
    #[serde(default)]
    pub links_to_single: BTreeMap<String, LinkToSingle>,
}

impl Table {
    /// Create a table carrying the mandatory `object_id` and `updated_at` fields
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut fields = BTreeMap::new();
        fields.insert(
            OBJECT_ID_FIELD.to_string(),
            Field::new(OBJECT_ID_FIELD, DataType::String),
        );
        fields.insert(
            UPDATED_AT_FIELD.to_string(),
            Field::new(UPDATED_AT_FIELD, DataType::Timestamp),
        );
        Self {
            id: name.clone(),
            name,
            description: None,
            fields,
            links_to_single: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a field
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Add a link to another table
    pub fn with_link(
        mut self,
        name: impl Into<String>,
        linked_table: impl Into<String>,
        parent_field: impl Into<String>,
        child_field: impl Into<String>,
    ) -> Self {
        let name = name.into();
        self.links_to_single.insert(
            name.clone(),
            LinkToSingle {
                name,
                linked_table: linked_table.into(),
                parent_field: parent_field.into(),
                child_field: child_field.into(),
            },
        );
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn link(&self, name: &str) -> Option<&LinkToSingle> {
        self.links_to_single.get(name)
    }
}

/// Schema consistency error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Table '{table}' is registered under key '{key}'")]
    TableKeyMismatch { key: String, table: String },

    #[error("Field '{field}' of table '{table}' is registered under key '{key}'")]
    FieldKeyMismatch {
        table: String,
        key: String,
        field: String,
    },

    #[error("Table '{table}' must declare non-nullable field '{field}' of type {expected}")]
    MandatoryField {
        table: String,
        field: String,
        expected: &'static str,
    },

    #[error("Link '{link}' of table '{table}' targets unknown table '{target}'")]
    UnknownLinkTable {
        table: String,
        link: String,
        target: String,
    },

    #[error("Link '{link}' of table '{table}' references unknown field '{on_table}.{field}'")]
    UnknownLinkField {
        table: String,
        link: String,
        on_table: String,
        field: String,
    },
}

/// All tables of one organization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataModel {
    pub tables: BTreeMap<String, Table>,
}

impl DataModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Check naming, mandatory fields and link targets
    pub fn validate(&self) -> Result<(), Vec<SchemaError>> {
        let mut errors = Vec::new();

        for (key, table) in &self.tables {
            if key != &table.name {
                errors.push(SchemaError::TableKeyMismatch {
                    key: key.clone(),
                    table: table.name.clone(),
                });
            }

            for (field_key, field) in &table.fields {
                if field_key != &field.name {
                    errors.push(SchemaError::FieldKeyMismatch {
                        table: table.name.clone(),
                        key: field_key.clone(),
                        field: field.name.clone(),
                    });
                }
            }

            for (name, expected) in [
                (OBJECT_ID_FIELD, DataType::String),
                (UPDATED_AT_FIELD, DataType::Timestamp),
            ] {
                let valid = table
                    .field(name)
                    .map(|f| f.data_type == expected && !f.nullable)
                    .unwrap_or(false);
                if !valid {
                    errors.push(SchemaError::MandatoryField {
                        table: table.name.clone(),
                        field: name.to_string(),
                        expected: expected.type_name(),
                    });
                }
            }

            for link in table.links_to_single.values() {
                if table.field(&link.child_field).is_none() {
                    errors.push(SchemaError::UnknownLinkField {
                        table: table.name.clone(),
                        link: link.name.clone(),
                        on_table: table.name.clone(),
                        field: link.child_field.clone(),
                    });
                }
                match self.table(&link.linked_table) {
                    None => errors.push(SchemaError::UnknownLinkTable {
                        table: table.name.clone(),
                        link: link.name.clone(),
                        target: link.linked_table.clone(),
                    }),
                    Some(target) if target.field(&link.parent_field).is_none() => {
                        errors.push(SchemaError::UnknownLinkField {
                            table: table.name.clone(),
                            link: link.name.clone(),
                            on_table: target.name.clone(),
                            field: link.parent_field.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
