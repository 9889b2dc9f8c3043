//! Unit tests for payload validation
//!
//! Every parse either fails fatally, reports a non-empty field error map, or
//! returns an object carrying exactly the table's declared fields.

use arbiter_core::types::{DataType, Field, PayloadError, PayloadParser, Strictness, Table};
use arbiter_core::Value;

fn tables() -> Vec<Table> {
    vec![
        Table::new("empty"),
        Table::new("transactions")
            .with_field(Field::new("amount", DataType::Int))
            .with_field(Field::new("currency", DataType::String).nullable()),
        Table::new("accounts")
            .with_field(Field::new("balance", DataType::Float).nullable())
            .with_field(Field::new("frozen", DataType::Bool))
            .with_field(Field::new("opened_at", DataType::Timestamp).nullable()),
    ]
}

fn payloads() -> Vec<&'static [u8]> {
    vec![
        b"",
        b"not json",
        b"null",
        b"42",
        b"\"text\"",
        b"[]",
        b"{}",
        b"{\"object_id\": null, \"updated_at\": null}",
        b"{\"object_id\": \"a\", \"updated_at\": \"2024-01-01T00:00:00Z\"}",
        b"{\"object_id\": \"a\", \"updated_at\": \"2024-01-01T00:00:00Z\", \"amount\": 15000}",
        b"{\"object_id\": \"a\", \"updated_at\": \"2024-01-01T00:00:00Z\", \"amount\": 1.5}",
        b"{\"object_id\": \"a\", \"updated_at\": \"2024-01-01T00:00:00Z\", \"amount\": 3, \"currency\": null}",
        b"{\"object_id\": \"a\", \"updated_at\": \"2024-01-01 08:30:00\", \"frozen\": true, \"balance\": 10}",
        b"{\"object_id\": \"a\", \"updated_at\": \"2024-01-01T00:00:00Z\", \"frozen\": \"yes\"}",
        b"{\"object_id\": 1, \"updated_at\": 2, \"amount\": [1], \"frozen\": {}, \"extra\": 3}",
    ]
}

// =============================================================================
// Totality
// =============================================================================

#[test]
fn test_parse_is_total() {
    for strictness in [Strictness::Ignore, Strictness::Reject] {
        let parser = PayloadParser::new().with_strictness(strictness);
        for table in tables() {
            for raw in payloads() {
                match parser.parse(&table, raw) {
                    Ok(object) => {
                        assert_eq!(object.table_name, table.name);
                        let declared: Vec<&String> = table.fields.keys().collect();
                        let present: Vec<&String> = object.data.keys().collect();
                        assert_eq!(declared, present, "payload {:?}", String::from_utf8_lossy(raw));
                    }
                    Err(PayloadError::InvalidFields(errors)) => assert!(!errors.is_empty()),
                    Err(PayloadError::MalformedJson(_)) | Err(PayloadError::NotAnObject(_)) => {}
                }
            }
        }
    }
}

#[test]
fn test_fatal_errors() {
    let table = Table::new("empty");
    let parser = PayloadParser::new();
    assert!(matches!(
        parser.parse(&table, b"not json"),
        Err(PayloadError::MalformedJson(_))
    ));
    assert_eq!(
        parser.parse(&table, b"\"text\""),
        Err(PayloadError::NotAnObject("string"))
    );
}

// =============================================================================
// Concrete tables
// =============================================================================

#[test]
fn test_transactions_payload() {
    let table = Table::new("transactions").with_field(Field::new("amount", DataType::Int));
    let object = PayloadParser::new()
        .parse(
            &table,
            br#"{"object_id": "tx-1", "updated_at": "2024-01-01T00:00:00Z", "amount": 15000}"#,
        )
        .unwrap();
    assert_eq!(object.get("amount"), &Value::Int(15000));
    assert_eq!(object.get("missing"), &Value::Null);
    assert!(object.updated_at().is_some());
}

#[test]
fn test_field_errors_display() {
    let table = Table::new("transactions").with_field(Field::new("amount", DataType::Int));
    let err = PayloadParser::new()
        .parse(&table, br#"{"object_id": "tx-1", "amount": true}"#)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid payload fields: amount: expected int, got bool; updated_at: field is required and not nullable"
    );
}

// =============================================================================
// Mandatory fields on loaded tables
// =============================================================================

/// A table as read from a snapshot, without `object_id` / `updated_at`
fn loaded_table() -> Table {
    serde_yaml::from_str(
        r#"
id: transactions
name: transactions
fields:
  amount:
    name: amount
    data_type: int
"#,
    )
    .unwrap()
}

#[test]
fn test_undeclared_mandatory_fields_are_typed_and_stored() {
    let table = loaded_table();
    assert!(!table.fields.contains_key("object_id"));

    let err = PayloadParser::new()
        .parse(
            &table,
            br#"{"object_id": 12, "updated_at": "yesterday", "amount": 5}"#,
        )
        .unwrap_err();
    let errors = err.field_errors().unwrap();
    assert_eq!(errors.get("object_id"), Some("expected string, got int"));
    assert!(errors.get("updated_at").is_some());

    let object = PayloadParser::new()
        .parse(
            &table,
            br#"{"object_id": "tx-1", "updated_at": "2024-01-01T00:00:00Z", "amount": 5}"#,
        )
        .unwrap();
    assert_eq!(object.object_id(), Some("tx-1"));
    assert!(object.updated_at().is_some());
    assert_eq!(object.get("amount"), &Value::Int(5));
}

#[test]
fn test_mandatory_field_types_override_declarations() {
    let mut table = loaded_table();
    table
        .fields
        .insert("object_id".to_string(), Field::new("object_id", DataType::Int));

    let err = PayloadParser::new()
        .parse(&table, br#"{"object_id": 7, "updated_at": "2024-01-01T00:00:00Z", "amount": 5}"#)
        .unwrap_err();
    assert_eq!(
        err.field_errors().unwrap().get("object_id"),
        Some("expected string, got int")
    );
}

#[test]
fn test_epoch_seconds_timestamps() {
    let table = Table::new("transactions");
    let object = PayloadParser::new()
        .parse(&table, br#"{"object_id": "tx-1", "updated_at": 1704067200}"#)
        .unwrap();
    assert_eq!(
        object.updated_at().map(|ts| ts.to_rfc3339()),
        Some("2024-01-01T00:00:00+00:00".to_string())
    );

    let err = PayloadParser::new()
        .parse(&table, br#"{"object_id": "tx-1", "updated_at": 1.5}"#)
        .unwrap_err();
    assert!(err.field_errors().unwrap().get("updated_at").is_some());
}
