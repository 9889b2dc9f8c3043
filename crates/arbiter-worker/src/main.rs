//! Arbiter batch worker
//!
//! Loads a repository snapshot, then scores a JSON-lines file of records
//! against the live scenarios and prints the summary.

use anyhow::Result;
use arbiter_runtime::InMemoryRecordStore;
use arbiter_sdk::{BatchOptions, DecisionEngineBuilder};
use arbiter_worker::config::{LogFormat, WorkerConfig};
use arbiter_worker::ingest::Ingestor;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = WorkerConfig::load()?;

    // Initialize tracing
    init_tracing(config.log_format)?;
    info!("Loaded configuration: {:?}", config);

    let records = Arc::new(InMemoryRecordStore::new());
    let engine = DecisionEngineBuilder::new()
        .with_config(config.engine.clone())
        .with_snapshot(&config.snapshot_path)
        .with_record_accessor(records.clone())
        .build()
        .await?;
    info!("Decision engine initialized");

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, letting running decisions finish");
            interrupt.cancel();
        }
    });

    let mut options = BatchOptions::new().with_cancellation(token);
    if let Some(secs) = config.deadline_secs {
        options = options.with_deadline(Instant::now() + Duration::from_secs(secs));
    }

    let ingestor = Ingestor::new(&engine, records, &config.organization_id, &config.table);
    let report = ingestor
        .run(&config.input_path, config.scenario_id.as_deref(), &options)
        .await?;

    info!(
        "Done: {} record(s), {} rejected, {} decided, {} skipped, {} errored, {} cancelled",
        report.records,
        report.rejected,
        report.summary.decided(),
        report.summary.skipped,
        report.summary.errored,
        report.summary.cancelled
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "arbiter_worker=info,arbiter_sdk=info,arbiter_runtime=warn".into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}
