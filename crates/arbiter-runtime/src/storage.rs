//! Related record storage
//!
//! Database accessors read fields of records linked to the trigger object.
//! The lookup goes through [`RecordAccessor`]; [`InMemoryRecordStore`] is the
//! implementation used by tests and the batch worker.

use crate::error::AccessError;
use arbiter_core::types::schema::OBJECT_ID_FIELD;
use arbiter_core::{ClientObject, Value};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Read access to stored records of an organization
#[async_trait]
pub trait RecordAccessor: Send + Sync {
    /// Find the record of `table` whose `field` equals `value`
    ///
    /// Int and Float keys compare by numeric value. When several records
    /// match, which one is returned is up to the implementation but must be
    /// stable.
    async fn find_record(
        &self,
        organization_id: &str,
        table: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<ClientObject>, AccessError>;
}

type TableKey = (String, String);

/// In-memory record store
///
/// Records are kept per organization and table, ordered by `object_id`.
/// Data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<HashMap<TableKey, BTreeMap<String, ClientObject>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record by `object_id`
    ///
    /// A record older than the stored one (by `updated_at`) is ignored.
    /// Returns whether the store changed.
    pub async fn upsert(
        &self,
        organization_id: &str,
        object: ClientObject,
    ) -> Result<bool, AccessError> {
        let object_id = object
            .object_id()
            .ok_or_else(|| AccessError::Lookup {
                table: object.table_name.clone(),
                field: OBJECT_ID_FIELD.to_string(),
                message: "record has no object_id".to_string(),
            })?
            .to_string();

        let mut tables = self.tables.write().await;
        let records = tables
            .entry((organization_id.to_string(), object.table_name.clone()))
            .or_default();

        if let Some(existing) = records.get(&object_id) {
            if let (Some(stored), Some(incoming)) = (existing.updated_at(), object.updated_at()) {
                if incoming < stored {
                    tracing::debug!(
                        "Ignoring stale {} record {} ({} < {})",
                        object.table_name,
                        object_id,
                        incoming,
                        stored
                    );
                    return Ok(false);
                }
            }
        }

        records.insert(object_id, object);
        Ok(true)
    }

    /// Number of records stored for a table
    pub async fn count(&self, organization_id: &str, table: &str) -> usize {
        let tables = self.tables.read().await;
        tables
            .get(&(organization_id.to_string(), table.to_string()))
            .map(BTreeMap::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl RecordAccessor for InMemoryRecordStore {
    async fn find_record(
        &self,
        organization_id: &str,
        table: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<ClientObject>, AccessError> {
        let tables = self.tables.read().await;
        let Some(records) = tables.get(&(organization_id.to_string(), table.to_string())) else {
            return Ok(None);
        };

        if field == OBJECT_ID_FIELD {
            if let Some(id) = value.as_str() {
                return Ok(records.get(id).cloned());
            }
        }

        Ok(records
            .values()
            .find(|record| record.get(field).loosely_equals(value))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn account(id: &str, iban: i64, updated_hour: u32) -> ClientObject {
        let mut data = BTreeMap::new();
        data.insert("object_id".to_string(), Value::from(id));
        data.insert(
            "updated_at".to_string(),
            Value::Timestamp(Utc.with_ymd_and_hms(2024, 1, 1, updated_hour, 0, 0).unwrap()),
        );
        data.insert("iban".to_string(), Value::Int(iban));
        ClientObject::new("accounts", data)
    }

    #[tokio::test]
    async fn test_find_by_object_id() {
        let store = InMemoryRecordStore::new();
        store.upsert("org", account("acc-1", 7, 1)).await.unwrap();

        let found = store
            .find_record("org", "accounts", "object_id", &Value::from("acc-1"))
            .await
            .unwrap();
        assert_eq!(
            found.and_then(|r| r.object_id().map(str::to_string)),
            Some("acc-1".to_string())
        );

        let other_org = store
            .find_record("other", "accounts", "object_id", &Value::from("acc-1"))
            .await
            .unwrap();
        assert!(other_org.is_none());
    }

    #[tokio::test]
    async fn test_find_by_field_widens_numbers() {
        let store = InMemoryRecordStore::new();
        store.upsert("org", account("acc-1", 7, 1)).await.unwrap();

        let found = store
            .find_record("org", "accounts", "iban", &Value::Float(7.0))
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_stale_upsert_is_ignored() {
        let store = InMemoryRecordStore::new();
        assert!(store.upsert("org", account("acc-1", 7, 5)).await.unwrap());
        assert!(!store.upsert("org", account("acc-1", 8, 4)).await.unwrap());
        assert!(store.upsert("org", account("acc-1", 9, 6)).await.unwrap());

        let found = store
            .find_record("org", "accounts", "object_id", &Value::from("acc-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("iban"), &Value::Int(9));
        assert_eq!(store.count("org", "accounts").await, 1);
    }
}
