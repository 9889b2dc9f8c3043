//! Repository snapshots
//!
//! A snapshot file seeds a [`crate::MemoryRepository`] with data models,
//! scenarios, iterations and the publication log. Files ending in `.yaml` or
//! `.yml` are read as YAML, anything else as JSON.

use crate::RepositoryResult;
use arbiter_core::{DataModel, Scenario, ScenarioIteration, ScenarioPublication};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    /// Organization id to data model
    #[serde(default)]
    pub data_models: BTreeMap<String, DataModel>,

    #[serde(default)]
    pub scenarios: Vec<Scenario>,

    #[serde(default)]
    pub iterations: Vec<ScenarioIteration>,

    #[serde(default)]
    pub publications: Vec<ScenarioPublication>,
}

impl RepositorySnapshot {
    /// Read a snapshot file
    pub async fn load(path: impl AsRef<Path>) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        tracing::debug!("Read snapshot {} ({} bytes)", path.display(), content.len());
        if is_yaml(path) {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Write a snapshot file, in the format given by its extension
    pub async fn save(&self, path: impl AsRef<Path>) -> RepositoryResult<()> {
        let path = path.as_ref();
        let content = if is_yaml(path) {
            serde_yaml::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub fn from_yaml(content: &str) -> RepositoryResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> RepositoryResult<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_detection() {
        assert!(is_yaml(Path::new("snapshot.yaml")));
        assert!(is_yaml(Path::new("dir/snapshot.yml")));
        assert!(!is_yaml(Path::new("snapshot.json")));
        assert!(!is_yaml(Path::new("snapshot")));
    }

    #[test]
    fn test_empty_documents() {
        assert_eq!(RepositorySnapshot::from_json("{}").unwrap(), RepositorySnapshot::default());
        assert_eq!(
            RepositorySnapshot::from_yaml("scenarios: []").unwrap(),
            RepositorySnapshot::default()
        );
    }
}
