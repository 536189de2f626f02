//! Model version and registered model records

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::stage::ModelStage;

/// Tag key under which the logging flavor of a version is recorded.
pub const FLAVOR_TAG: &str = "flavor";

/// Registration status of a model version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelVersionStatus {
    PendingRegistration,
    FailedRegistration,
    Ready,
}

/// Model version metadata as held by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    /// Registered model name (already environment-scoped)
    pub name: String,
    /// Version number (monotonically increasing per model)
    pub version: u64,
    /// Current stage
    pub current_stage: ModelStage,
    /// Artifact location the version was created from
    pub source: String,
    /// Run that produced the artifacts, if any
    pub run_id: Option<String>,
    pub status: ModelVersionStatus,
    pub status_message: Option<String>,
    pub description: Option<String>,
    /// Tags for organization
    pub tags: HashMap<String, String>,
    pub run_link: Option<String>,
    pub user_id: Option<String>,
    /// Creation time (Unix ms)
    pub creation_timestamp: i64,
    /// Last update time (Unix ms)
    pub last_updated_timestamp: i64,
}

impl ModelVersion {
    /// Create a ready version at stage `None`
    pub fn new(name: &str, version: u64, source: &str) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            name: name.to_string(),
            version,
            current_stage: ModelStage::None,
            source: source.to_string(),
            run_id: None,
            status: ModelVersionStatus::Ready,
            status_message: None,
            description: None,
            tags: HashMap::new(),
            run_link: None,
            user_id: None,
            creation_timestamp: now,
            last_updated_timestamp: now,
        }
    }

    /// Add a tag
    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    /// Flavor the version was logged with, if recorded
    pub fn flavor(&self) -> Option<&str> {
        self.tags.get(FLAVOR_TAG).map(String::as_str)
    }
}

/// A registered model (the container of versions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredModel {
    pub name: String,
    pub description: Option<String>,
    pub tags: HashMap<String, String>,
    /// Latest version per stage, as reported by the server
    pub latest_versions: Vec<ModelVersion>,
    pub creation_timestamp: i64,
    pub last_updated_timestamp: i64,
}

impl RegisteredModel {
    pub fn new(name: &str) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            name: name.to_string(),
            description: None,
            tags: HashMap::new(),
            latest_versions: Vec::new(),
            creation_timestamp: now,
            last_updated_timestamp: now,
        }
    }
}

/// Request to create a model version
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewModelVersion {
    pub name: String,
    pub source: String,
    pub run_id: Option<String>,
    pub tags: HashMap<String, String>,
    pub run_link: Option<String>,
    pub description: Option<String>,
}

impl NewModelVersion {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self { name: name.into(), source: source.into(), ..Default::default() }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
