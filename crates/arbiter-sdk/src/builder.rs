//! Builder pattern for DecisionEngine

use crate::config::EngineConfig;
use crate::decision_engine::{DecisionEngine, DecisionObserver};
use crate::error::{Result, SdkError};
use arbiter_core::FunctionCatalog;
use arbiter_repository::{EngineRepository, MemoryRepository, RepositorySnapshot};
use arbiter_runtime::{InMemoryRecordStore, RecordAccessor};
use std::path::PathBuf;
use std::sync::Arc;

/// Builder for DecisionEngine
///
/// # Example
///
/// ```rust,ignore
/// use arbiter_sdk::DecisionEngineBuilder;
///
/// // Seeded from a snapshot file
/// let engine = DecisionEngineBuilder::new()
///     .with_snapshot("snapshot.yaml")
///     .build()
///     .await?;
///
/// // Explicit collaborators (for tests)
/// let engine = DecisionEngineBuilder::new()
///     .with_repository(repository)
///     .with_record_accessor(records)
///     .with_max_concurrency(4)
///     .build()
///     .await?;
/// ```
pub struct DecisionEngineBuilder {
    config: EngineConfig,
    repository: Option<Arc<dyn EngineRepository>>,
    snapshot_path: Option<PathBuf>,
    record_accessor: Option<Arc<dyn RecordAccessor>>,
    catalog: Option<Arc<FunctionCatalog>>,
    observers: Vec<Arc<dyn DecisionObserver>>,
}

impl DecisionEngineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: EngineConfig::new(),
            repository: None,
            snapshot_path: None,
            record_accessor: None,
            catalog: None,
            observers: Vec::new(),
        }
    }

    // ========== Repository ==========

    /// Use an existing repository
    pub fn with_repository(mut self, repository: Arc<dyn EngineRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Seed an in-memory repository from a snapshot file at build time
    ///
    /// Ignored when a repository is set with [`Self::with_repository`].
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    // ========== Evaluation ==========

    /// Record store read by database accessors; an empty in-memory store by default
    pub fn with_record_accessor(mut self, accessor: Arc<dyn RecordAccessor>) -> Self {
        self.record_accessor = Some(accessor);
        self
    }

    /// Function catalog; the standard catalog by default
    pub fn with_catalog(mut self, catalog: FunctionCatalog) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    pub fn add_observer(mut self, observer: Arc<dyn DecisionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    // ========== Configuration ==========

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    pub fn with_memoized_accessors(mut self, enabled: bool) -> Self {
        self.config.memoize_accessors = enabled;
        self
    }

    /// Build the engine
    pub async fn build(self) -> Result<DecisionEngine> {
        self.config.validate()?;

        let repository: Arc<dyn EngineRepository> = match (self.repository, self.snapshot_path) {
            (Some(repository), _) => repository,
            (None, Some(path)) => {
                let snapshot = RepositorySnapshot::load(&path).await.map_err(|e| {
                    SdkError::ConfigError(format!(
                        "Failed to load snapshot {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                let repository = MemoryRepository::from_snapshot(snapshot).map_err(|e| {
                    SdkError::ConfigError(format!("Invalid snapshot {}: {}", path.display(), e))
                })?;
                tracing::info!("Loaded repository snapshot {}", path.display());
                Arc::new(repository)
            }
            (None, None) => {
                return Err(SdkError::ConfigError(
                    "a repository or a snapshot path is required".to_string(),
                ))
            }
        };

        let record_accessor = self
            .record_accessor
            .unwrap_or_else(|| Arc::new(InMemoryRecordStore::new()));
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(FunctionCatalog::standard()));

        tracing::debug!(
            "Building decision engine: {} functions, {} observer(s), max concurrency {}",
            catalog.len(),
            self.observers.len(),
            self.config.max_concurrency
        );

        Ok(DecisionEngine::new(
            repository,
            record_accessor,
            catalog,
            self.config,
            self.observers,
        ))
    }
}

impl Default for DecisionEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
