//! JSON payloads of the MLflow REST API 2.0
//!
//! The server sends versions as strings and, depending on version, int64
//! timestamps as either numbers or strings. These types accept both and
//! convert into the registry's domain records.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use crate::registry::{
    Experiment, ModelStage, ModelVersion, ModelVersionStatus, RegisteredModel, RegistryError,
    RunInfo, RunStatus,
};

/// Error payload: `{"error_code": "...", "message": "..."}`
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error_code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Tag {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

fn tags_to_map(tags: Vec<Tag>) -> HashMap<String, String> {
    tags.into_iter().map(|t| (t.key, t.value)).collect()
}

/// int64 fields arrive as numbers or as decimal strings
fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {n}"))),
        Some(serde_json::Value::String(s)) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{s}': {e}"))),
        Some(other) => Err(serde::de::Error::custom(format!("invalid timestamp: {other}"))),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireExperiment {
    pub experiment_id: String,
    pub name: String,
    pub artifact_location: Option<String>,
    pub lifecycle_stage: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl From<WireExperiment> for Experiment {
    fn from(w: WireExperiment) -> Self {
        Self {
            experiment_id: w.experiment_id,
            name: w.name,
            artifact_location: w.artifact_location,
            lifecycle_stage: w.lifecycle_stage.unwrap_or_else(|| "active".to_string()),
            tags: tags_to_map(w.tags),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireRunInfo {
    #[serde(alias = "run_uuid")]
    pub run_id: String,
    pub experiment_id: String,
    pub run_name: Option<String>,
    pub status: RunStatus,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub start_time: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub artifact_uri: String,
}

impl From<WireRunInfo> for RunInfo {
    fn from(w: WireRunInfo) -> Self {
        Self {
            run_id: w.run_id,
            experiment_id: w.experiment_id,
            run_name: w.run_name,
            status: w.status,
            start_time: w.start_time,
            end_time: w.end_time,
            artifact_uri: w.artifact_uri,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireRun {
    pub info: WireRunInfo,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireModelVersion {
    pub name: String,
    pub version: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub creation_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub last_updated_timestamp: Option<i64>,
    pub user_id: Option<String>,
    pub current_stage: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub source: String,
    pub run_id: Option<String>,
    pub status: Option<ModelVersionStatus>,
    pub status_message: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub run_link: Option<String>,
}

impl TryFrom<WireModelVersion> for ModelVersion {
    type Error = RegistryError;

    fn try_from(w: WireModelVersion) -> Result<Self, Self::Error> {
        let version = w.version.trim().parse::<u64>().map_err(|e| RegistryError::Decode {
            message: format!("model version '{}' of {} is not numeric: {e}", w.version, w.name),
        })?;
        let current_stage = match w.current_stage.as_deref() {
            None | Some("") => ModelStage::None,
            Some(stage) => stage.parse().map_err(|message| RegistryError::Decode { message })?,
        };
        Ok(Self {
            name: w.name,
            version,
            current_stage,
            source: w.source,
            run_id: w.run_id.filter(|id| !id.is_empty()),
            status: w.status.unwrap_or(ModelVersionStatus::Ready),
            status_message: w.status_message,
            description: w.description.filter(|d| !d.is_empty()),
            tags: tags_to_map(w.tags),
            run_link: w.run_link.filter(|l| !l.is_empty()),
            user_id: w.user_id.filter(|u| !u.is_empty()),
            creation_timestamp: w.creation_timestamp.unwrap_or_default(),
            last_updated_timestamp: w.last_updated_timestamp.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireRegisteredModel {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub creation_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub last_updated_timestamp: Option<i64>,
    pub description: Option<String>,
    #[serde(default)]
    pub latest_versions: Vec<WireModelVersion>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl TryFrom<WireRegisteredModel> for RegisteredModel {
    type Error = RegistryError;

    fn try_from(w: WireRegisteredModel) -> Result<Self, Self::Error> {
        let latest_versions = w
            .latest_versions
            .into_iter()
            .map(ModelVersion::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: w.name,
            description: w.description.filter(|d| !d.is_empty()),
            tags: tags_to_map(w.tags),
            latest_versions,
            creation_timestamp: w.creation_timestamp.unwrap_or_default(),
            last_updated_timestamp: w.last_updated_timestamp.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateExperimentResponse {
    pub experiment_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetExperimentResponse {
    pub experiment: WireExperiment,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunResponse {
    pub run: WireRun,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateRunResponse {
    pub run_info: WireRunInfo,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisteredModelResponse {
    pub registered_model: WireRegisteredModel,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelVersionResponse {
    pub model_version: WireModelVersion,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelVersionsResponse {
    #[serde(default)]
    pub model_versions: Vec<WireModelVersion>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DownloadUriResponse {
    pub artifact_uri: String,
}

/// Endpoints that answer with `{}`
#[derive(Debug, Deserialize)]
pub(crate) struct Empty {}
