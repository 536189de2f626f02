//! Experiment and run records

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An experiment (the folder runs are grouped under)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    /// Full experiment path, e.g. `/experiments/acc/training`
    pub name: String,
    pub artifact_location: Option<String>,
    /// `active` or `deleted`
    pub lifecycle_stage: String,
    pub tags: HashMap<String, String>,
}

/// Status of a tracking run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Run is actively recording
    Running,
    /// Run is queued but not started
    Scheduled,
    /// Run completed successfully
    Finished,
    /// Run failed
    Failed,
    /// Run was cancelled
    Killed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Scheduled => "SCHEDULED",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
            RunStatus::Killed => "KILLED",
        }
    }

    /// Whether the run has ended
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Finished | RunStatus::Failed | RunStatus::Killed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Metadata of a single run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub experiment_id: String,
    pub run_name: Option<String>,
    pub status: RunStatus,
    /// Unix timestamp (ms) when the run started
    pub start_time: Option<i64>,
    /// Unix timestamp (ms) when the run ended
    pub end_time: Option<i64>,
    /// Root under which the run's artifacts are stored
    pub artifact_uri: String,
}
