//! JSON-lines ingestion
//!
//! Every non-blank line is one payload of the configured table. Lines failing
//! validation, or that the record store refuses, are logged and counted as
//! rejected. Valid records are upserted into the record store, so later
//! records and database accessors can read them, then decided. A record whose
//! decisions fail is counted as errored and the run goes on.

use crate::error::{Result, WorkerError};
use arbiter_core::ClientObject;
use arbiter_runtime::InMemoryRecordStore;
use arbiter_sdk::{BatchOptions, BatchSummary, DecisionEngine, SdkError};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Records accepted by the payload validator
    pub records: usize,

    /// Lines rejected by the payload validator
    pub rejected: usize,

    pub summary: BatchSummary,
}

pub struct Ingestor<'a> {
    engine: &'a DecisionEngine,
    records: Arc<InMemoryRecordStore>,
    organization_id: String,
    table: String,
}

impl<'a> Ingestor<'a> {
    pub fn new(
        engine: &'a DecisionEngine,
        records: Arc<InMemoryRecordStore>,
        organization_id: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            records,
            organization_id: organization_id.into(),
            table: table.into(),
        }
    }

    /// Ingest a JSON-lines file and decide its records
    ///
    /// With a `scenario_id` the records are decided as one batch against that
    /// scenario; otherwise each record goes through every live scenario of
    /// the table.
    pub async fn run(
        &self,
        input: impl AsRef<Path>,
        scenario_id: Option<&str>,
        options: &BatchOptions,
    ) -> Result<IngestReport> {
        let input = input.as_ref();
        let content = tokio::fs::read_to_string(input)
            .await
            .map_err(|source| WorkerError::Input {
                path: input.to_path_buf(),
                source,
            })?;

        let mut report = IngestReport::default();
        let objects = self.parse_lines(&content, &mut report).await?;
        tracing::info!(
            "Read {} record(s) from {}, {} rejected",
            report.records,
            input.display(),
            report.rejected
        );

        report.summary = match scenario_id {
            Some(scenario_id) => {
                self.engine
                    .decide_batch(&self.organization_id, scenario_id, objects, options.clone())
                    .await?
                    .summary
            }
            None => self.decide_all(objects, options).await,
        };
        Ok(report)
    }

    async fn parse_lines(
        &self,
        content: &str,
        report: &mut IngestReport,
    ) -> Result<Vec<ClientObject>> {
        let mut objects = Vec::new();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let object = match self
                .engine
                .parse_payload(&self.organization_id, &self.table, line.as_bytes())
                .await
            {
                Ok(object) => object,
                Err(SdkError::Payload(e)) => {
                    tracing::warn!("Line {} rejected: {}", index + 1, e);
                    report.rejected += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match self
                .records
                .upsert(&self.organization_id, object.clone())
                .await
            {
                Ok(true) => {}
                Ok(false) => tracing::debug!(
                    "Line {} is older than the stored record {:?}",
                    index + 1,
                    object.object_id()
                ),
                Err(e) => {
                    tracing::warn!("Line {} could not be stored: {}", index + 1, e);
                    report.rejected += 1;
                    continue;
                }
            }
            report.records += 1;
            objects.push(object);
        }

        Ok(objects)
    }

    /// Decide every record against all live scenarios of the table, up to
    /// `max_concurrency` records at a time
    async fn decide_all(
        &self,
        objects: Vec<ClientObject>,
        options: &BatchOptions,
    ) -> BatchSummary {
        let concurrency = self.engine.config().max_concurrency.max(1);

        let mut results = stream::iter(objects)
            .map(|object| async move {
                if options.is_cancelled() {
                    return None;
                }
                let object_id = object.object_id().map(str::to_string);
                let result = self
                    .engine
                    .create_all_decisions(&self.organization_id, &self.table, object)
                    .await;
                Some((object_id, result))
            })
            .buffer_unordered(concurrency);

        let mut summary = BatchSummary::default();
        while let Some(result) = results.next().await {
            match result {
                None => {
                    summary.total += 1;
                    summary.cancelled += 1;
                }
                Some((_, Ok(report))) => summary.merge(&report.summary),
                Some((object_id, Err(e))) => {
                    tracing::warn!("No decisions for record {:?}: {}", object_id, e);
                    summary.total += 1;
                    summary.errored += 1;
                }
            }
        }

        if summary.cancelled > 0 {
            tracing::warn!("Cancelled, {} record(s) not decided", summary.cancelled);
        }
        summary
    }
}
