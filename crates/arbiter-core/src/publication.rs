//! Publication log
//!
//! Publishing and unpublishing iterations appends entries to a per-scenario
//! log. The live iteration is the one named by the latest publish entry that
//! no later unpublish entry resolved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationAction {
    Publish,
    Unpublish,
}

/// Append-only log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPublication {
    pub id: String,
    pub organization_id: String,
    pub scenario_id: String,
    pub iteration_id: String,
    pub action: PublicationAction,

    /// Strictly increasing across the log
    pub rank: u64,

    pub created_at: DateTime<Utc>,
}

/// Derive the live iteration of a scenario by replaying its log in rank order
pub fn replay_live_iteration<'a, I>(scenario_id: &str, log: I) -> Option<String>
where
    I: IntoIterator<Item = &'a ScenarioPublication>,
{
    let mut entries: Vec<&ScenarioPublication> = log
        .into_iter()
        .filter(|p| p.scenario_id == scenario_id)
        .collect();
    entries.sort_by_key(|p| p.rank);

    let mut live: Option<&str> = None;
    for entry in entries {
        match entry.action {
            PublicationAction::Publish => live = Some(&entry.iteration_id),
            PublicationAction::Unpublish => {
                if live == Some(entry.iteration_id.as_str()) {
                    live = None;
                }
            }
        }
    }
    live.map(str::to_string)
}
