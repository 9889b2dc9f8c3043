//! Worker configuration

use arbiter_sdk::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Worker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Organization owning the records and scenarios
    pub organization_id: String,

    /// Repository snapshot (YAML or JSON) with data model, scenarios and publications
    pub snapshot_path: PathBuf,

    /// JSON-lines file of records to decide
    pub input_path: PathBuf,

    /// Table the input records belong to
    pub table: String,

    /// Decide only this scenario; every live scenario of `table` when unset
    pub scenario_id: Option<String>,

    pub log_format: LogFormat,

    pub engine: EngineConfig,

    /// Stop starting new decisions after this many seconds
    pub deadline_secs: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            organization_id: "default".to_string(),
            snapshot_path: PathBuf::from("snapshot.yaml"),
            input_path: PathBuf::from("records.jsonl"),
            table: "transactions".to_string(),
            scenario_id: None,
            log_format: LogFormat::Pretty,
            engine: EngineConfig::default(),
            deadline_secs: None,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from `config/worker` and environment variables
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from("config/worker")
    }

    /// Load configuration from a file (any format the `config` crate reads,
    /// extension optional) overridden by `ARBITER_` environment variables
    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        // Load .env file if exists
        dotenvy::dotenv().ok();

        let config_result = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("ARBITER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build();

        match config_result {
            Ok(cfg) => cfg
                .try_deserialize()
                .map_err(|e| anyhow::anyhow!("Failed to deserialize config: {}", e)),
            Err(e) => {
                tracing::info!("No usable config file ({}), using default configuration", e);
                Ok(Self::default())
            }
        }
    }
}
