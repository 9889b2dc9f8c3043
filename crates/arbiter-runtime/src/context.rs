//! Evaluation context
//!
//! Bundles what a formula can read: the trigger object, the organization's
//! data model, the record store for linked records and the decision clock.
//! Linked record lookups are memoized for the lifetime of the context, so a
//! record read by several rules of one decision is fetched once.

use crate::error::{EvalError, Result};
use crate::storage::RecordAccessor;
use arbiter_core::{ClientObject, DataModel, Table, Value};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// (table, field, lookup key)
type RecordKey = (String, String, String);

pub struct EvaluationContext {
    organization_id: String,
    trigger_object: ClientObject,
    data_model: Arc<DataModel>,
    accessor: Arc<dyn RecordAccessor>,
    cache: Option<Mutex<HashMap<RecordKey, Option<ClientObject>>>>,
    now: DateTime<Utc>,
}

impl EvaluationContext {
    pub fn new(
        organization_id: impl Into<String>,
        trigger_object: ClientObject,
        data_model: Arc<DataModel>,
        accessor: Arc<dyn RecordAccessor>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            trigger_object,
            data_model,
            accessor,
            cache: Some(Mutex::new(HashMap::new())),
            now: Utc::now(),
        }
    }

    /// Fix the clock read by `TimeNow`
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Fetch linked records on every access
    pub fn without_memoization(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn trigger_object(&self) -> &ClientObject {
        &self.trigger_object
    }

    pub fn data_model(&self) -> &DataModel {
        &self.data_model
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Definition of the trigger object's table
    pub fn trigger_table(&self) -> Result<&Table> {
        self.table(&self.trigger_object.table_name)
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.data_model
            .table(name)
            .ok_or_else(|| EvalError::AccessorNotFound(format!("table '{name}'")))
    }

    /// Consume the context, returning the trigger object
    pub fn into_trigger_object(self) -> ClientObject {
        self.trigger_object
    }

    /// Record of `table` whose `field` equals `value`
    pub async fn related_record(
        &self,
        table: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<ClientObject>> {
        let (Some(cache), Some(key)) = (&self.cache, value.lookup_key()) else {
            return self.fetch(table, field, value).await;
        };

        let cache_key = (table.to_string(), field.to_string(), key);
        if let Some(cached) = cache.lock().await.get(&cache_key) {
            return Ok(cached.clone());
        }

        let record = self.fetch(table, field, value).await?;
        cache.lock().await.insert(cache_key, record.clone());
        Ok(record)
    }

    async fn fetch(&self, table: &str, field: &str, value: &Value) -> Result<Option<ClientObject>> {
        tracing::debug!("Fetching {}.{} = {:?}", table, field, value);
        Ok(self
            .accessor
            .find_record(&self.organization_id, table, field, value)
            .await?)
    }
}
