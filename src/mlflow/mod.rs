//! MLflow tracking server HTTP client
//!
//! Implements [`RegistryClient`] against the MLflow REST API 2.0
//! (`{tracking_uri}/api/2.0/mlflow/...`). Works with a self-hosted tracking
//! server and with Databricks-hosted MLflow. Artifact uploads go through the
//! server's artifact proxy, so runs must store artifacts under an
//! `mlflow-artifacts:` location.

mod wire;


use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::registry::{
    Experiment, ModelArtifact, ModelInfo, ModelStage, ModelVersion, NewModelVersion,
    RegisteredModel, RegistryClient, RegistryError, Result, RunInfo, RunStatus,
};
use wire::{
    CreateExperimentResponse, DownloadUriResponse, Empty, ErrorBody, GetExperimentResponse,
    ModelVersionResponse, ModelVersionsResponse, RegisteredModelResponse, RunResponse,
    UpdateRunResponse,
};

const API_PREFIX: &str = "api/2.0/mlflow";
const ARTIFACTS_PREFIX: &str = "api/2.0/mlflow-artifacts/artifacts";
const ARTIFACTS_SCHEME: &str = "mlflow-artifacts:";
const SEARCH_PAGE_SIZE: usize = 200;

/// Credentials sent with every request
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Bearer(String),
    Basic { username: String, password: String },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bearer(_) => write!(f, "Bearer(..)"),
            Self::Basic { username, .. } => write!(f, "Basic({username})"),
        }
    }
}

/// Where the tracking and registry APIs live and how to authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Base URL of the tracking server, without trailing slash
    pub tracking_uri: String,
    /// Base URL of the model registry; usually the tracking server
    pub registry_uri: String,
    pub auth: Auth,
}

/// Blocking MLflow REST client
pub struct MlflowRestClient {
    endpoint: Endpoint,
    client: reqwest::blocking::Client,
}

impl MlflowRestClient {
    /// Create a client for the given endpoint
    pub fn new(endpoint: Endpoint, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Http {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn authorize(&self, request: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match &self.endpoint.auth {
            Auth::None => request,
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }

    fn get<T: DeserializeOwned>(&self, base: &str, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = api_url(base, path);
        debug!(method = "GET", %url, "mlflow request");
        let request = self.authorize(self.client.get(&url).query(query));
        let response = request.send().map_err(|e| RegistryError::Http {
            message: format!("GET {path} failed: {e}"),
        })?;
        read_response(response)
    }

    fn post<T: DeserializeOwned>(&self, base: &str, path: &str, body: &serde_json::Value) -> Result<T> {
        let url = api_url(base, path);
        debug!(method = "POST", %url, "mlflow request");
        let request = self.authorize(self.client.post(&url).json(body));
        let response = request.send().map_err(|e| RegistryError::Http {
            message: format!("POST {path} failed: {e}"),
        })?;
        read_response(response)
    }

    fn tracking_get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        self.get(&self.endpoint.tracking_uri, path, query)
    }

    fn tracking_post<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T> {
        self.post(&self.endpoint.tracking_uri, path, body)
    }

    fn registry_get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        self.get(&self.endpoint.registry_uri, path, query)
    }

    fn registry_post<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T> {
        self.post(&self.endpoint.registry_uri, path, body)
    }

    /// PUT one file through the artifact proxy
    fn upload_artifact(&self, artifact_path: &str, content: Vec<u8>) -> Result<()> {
        let url = format!(
            "{}/{ARTIFACTS_PREFIX}/{}",
            self.endpoint.tracking_uri,
            artifact_path.trim_start_matches('/')
        );
        debug!(method = "PUT", %url, bytes = content.len(), "mlflow artifact upload");
        let request = self.authorize(
            self.client.put(&url).header("Content-Type", "application/octet-stream").body(content),
        );
        let response = request.send().map_err(|e| RegistryError::Http {
            message: format!("Upload of {artifact_path} failed: {e}"),
        })?;
        read_response::<Empty>(response).map(|_| ())
    }
}

impl std::fmt::Debug for MlflowRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MlflowRestClient")
            .field("tracking_uri", &self.endpoint.tracking_uri)
            .field("registry_uri", &self.endpoint.registry_uri)
            .field("auth", &self.endpoint.auth)
            .finish_non_exhaustive()
    }
}

fn api_url(base: &str, path: &str) -> String {
    format!("{}/{API_PREFIX}/{path}", base.trim_end_matches('/'))
}

fn read_response<T: DeserializeOwned>(response: reqwest::blocking::Response) -> Result<T> {
    let status = response.status().as_u16();
    let body = response.text().map_err(|e| RegistryError::Http {
        message: format!("Failed to read response body: {e}"),
    })?;
    if (200..300).contains(&status) {
        decode_body(&body)
    } else {
        Err(decode_error(status, &body))
    }
}

/// Decode a success body; an empty body reads as `{}`.
pub(crate) fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    let body = if body.trim().is_empty() { "{}" } else { body };
    serde_json::from_str(body).map_err(|e| RegistryError::Decode { message: e.to_string() })
}

/// Turn a non-2xx response into [`RegistryError::Api`].
pub(crate) fn decode_error(status: u16, body: &str) -> RegistryError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error_code, message }) => RegistryError::Api {
            status,
            code: error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
            message: message.unwrap_or_default(),
        },
        Err(_) => RegistryError::Api {
            status,
            code: "UNKNOWN".to_string(),
            message: body.trim().chars().take(512).collect(),
        },
    }
}

/// Search filter matching exactly one registered model name
pub(crate) fn name_filter(name: &str) -> String {
    if name.contains('\'') {
        format!("name=\"{}\"", name.replace('"', "\\\""))
    } else {
        format!("name='{name}'")
    }
}

/// Proxy path of an `mlflow-artifacts:` location.
///
/// Accepts `mlflow-artifacts:/1/<run>/artifacts` and the
/// `mlflow-artifacts://host:port/1/<run>/artifacts` form.
pub(crate) fn artifact_proxy_path(uri: &str) -> Result<String> {
    let rest = uri
        .strip_prefix(ARTIFACTS_SCHEME)
        .ok_or_else(|| RegistryError::UnsupportedArtifactUri { uri: uri.to_string() })?;
    let path = match rest.strip_prefix("//") {
        Some(with_authority) => with_authority.find('/').map_or("", |i| &with_authority[i..]),
        None => rest,
    };
    Ok(path.trim_matches('/').to_string())
}

fn tags_json(tags: &HashMap<String, String>) -> serde_json::Value {
    let mut pairs: Vec<_> = tags.iter().collect();
    pairs.sort();
    serde_json::Value::Array(
        pairs
            .into_iter()
            .map(|(key, value)| serde_json::json!({ "key": key, "value": value }))
            .collect(),
    )
}

impl RegistryClient for MlflowRestClient {
    fn create_experiment(&self, name: &str) -> Result<String> {
        let response: CreateExperimentResponse =
            self.tracking_post("experiments/create", &serde_json::json!({ "name": name }))?;
        Ok(response.experiment_id)
    }

    fn get_experiment_by_name(&self, name: &str) -> Result<Option<Experiment>> {
        match self.tracking_get::<GetExperimentResponse>(
            "experiments/get-by-name",
            &[("experiment_name", name)],
        ) {
            Ok(response) => Ok(Some(response.experiment.into())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create_run(&self, experiment_id: &str, run_name: Option<&str>) -> Result<RunInfo> {
        let mut body = serde_json::json!({
            "experiment_id": experiment_id,
            "start_time": chrono::Utc::now().timestamp_millis(),
        });
        if let Some(run_name) = run_name {
            body["run_name"] = serde_json::Value::String(run_name.to_string());
        }
        let response: RunResponse = self.tracking_post("runs/create", &body)?;
        Ok(response.run.info.into())
    }

    fn get_run(&self, run_id: &str) -> Result<RunInfo> {
        let response: RunResponse = self.tracking_get("runs/get", &[("run_id", run_id)])?;
        Ok(response.run.info.into())
    }

    fn update_run(
        &self,
        run_id: &str,
        status: RunStatus,
        end_time: Option<i64>,
    ) -> Result<RunInfo> {
        let mut body = serde_json::json!({ "run_id": run_id, "status": status.as_str() });
        if let Some(end_time) = end_time {
            body["end_time"] = serde_json::json!(end_time);
        }
        let response: UpdateRunResponse = self.tracking_post("runs/update", &body)?;
        Ok(response.run_info.into())
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        let body = serde_json::json!({ "run_id": run_id, "key": key, "value": value });
        self.tracking_post::<Empty>("runs/log-parameter", &body).map(|_| ())
    }

    fn log_metric(
        &self,
        run_id: &str,
        key: &str,
        value: f64,
        timestamp: i64,
        step: u64,
    ) -> Result<()> {
        let body = serde_json::json!({
            "run_id": run_id,
            "key": key,
            "value": value,
            "timestamp": timestamp,
            "step": step,
        });
        self.tracking_post::<Empty>("runs/log-metric", &body).map(|_| ())
    }

    fn log_model(&self, run_id: &str, artifact: &ModelArtifact) -> Result<ModelInfo> {
        let run = self.get_run(run_id)?;
        let files = artifact.files()?;
        let root = artifact_proxy_path(&run.artifact_uri)?;
        let target = format!("{root}/{}", artifact.artifact_path.trim_matches('/'));

        let mut has_mlmodel = false;
        for (local, relative) in &files {
            has_mlmodel |= relative == "MLmodel";
            let content = std::fs::read(local)?;
            self.upload_artifact(&format!("{target}/{relative}"), content)?;
        }

        let info = ModelInfo::new(&run, artifact);
        let model_json = info.mlmodel_json();
        if !has_mlmodel {
            let mlmodel = serde_yaml::to_string(&model_json).map_err(|e| RegistryError::Decode {
                message: format!("Failed to render MLmodel: {e}"),
            })?;
            self.upload_artifact(&format!("{target}/MLmodel"), mlmodel.into_bytes())?;
        }

        let body = serde_json::json!({ "run_id": run_id, "model_json": model_json.to_string() });
        self.tracking_post::<Empty>("runs/log-model", &body)?;
        Ok(info)
    }

    fn create_registered_model(
        &self,
        name: &str,
        tags: &HashMap<String, String>,
        description: Option<&str>,
    ) -> Result<RegisteredModel> {
        let mut body = serde_json::json!({ "name": name, "tags": tags_json(tags) });
        if let Some(description) = description {
            body["description"] = serde_json::Value::String(description.to_string());
        }
        let response: RegisteredModelResponse =
            self.registry_post("registered-models/create", &body)?;
        response.registered_model.try_into()
    }

    fn get_registered_model(&self, name: &str) -> Result<RegisteredModel> {
        let response: RegisteredModelResponse =
            self.registry_get("registered-models/get", &[("name", name)])?;
        response.registered_model.try_into()
    }

    fn set_registered_model_tag(&self, name: &str, key: &str, value: &str) -> Result<()> {
        let body = serde_json::json!({ "name": name, "key": key, "value": value });
        self.registry_post::<Empty>("registered-models/set-tag", &body).map(|_| ())
    }

    fn create_model_version(&self, request: &NewModelVersion) -> Result<ModelVersion> {
        let mut body = serde_json::json!({
            "name": request.name,
            "source": request.source,
            "tags": tags_json(&request.tags),
        });
        if let Some(run_id) = &request.run_id {
            body["run_id"] = serde_json::Value::String(run_id.clone());
        }
        if let Some(run_link) = &request.run_link {
            body["run_link"] = serde_json::Value::String(run_link.clone());
        }
        if let Some(description) = &request.description {
            body["description"] = serde_json::Value::String(description.clone());
        }
        let response: ModelVersionResponse = self.registry_post("model-versions/create", &body)?;
        response.model_version.try_into()
    }

    fn get_model_version(&self, name: &str, version: u64) -> Result<ModelVersion> {
        let version = version.to_string();
        let response: ModelVersionResponse =
            self.registry_get("model-versions/get", &[("name", name), ("version", &version)])?;
        response.model_version.try_into()
    }

    fn search_model_versions(&self, name: &str) -> Result<Vec<ModelVersion>> {
        let filter = name_filter(name);
        let page_size = SEARCH_PAGE_SIZE.to_string();
        let mut versions = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("filter", filter.as_str()), ("max_results", page_size.as_str())];
            if let Some(token) = page_token.as_deref() {
                query.push(("page_token", token));
            }
            let page: ModelVersionsResponse = self.registry_get("model-versions/search", &query)?;
            for mv in page.model_versions {
                versions.push(ModelVersion::try_from(mv)?);
            }
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(versions)
    }

    fn get_latest_versions(&self, name: &str, stages: &[ModelStage]) -> Result<Vec<ModelVersion>> {
        let stages: Vec<&str> = stages.iter().map(ModelStage::as_str).collect();
        let body = serde_json::json!({ "name": name, "stages": stages });
        let response: ModelVersionsResponse =
            self.registry_post("registered-models/get-latest-versions", &body)?;
        response.model_versions.into_iter().map(ModelVersion::try_from).collect()
    }

    fn transition_model_version_stage(
        &self,
        name: &str,
        version: u64,
        stage: ModelStage,
        archive_existing_versions: bool,
    ) -> Result<ModelVersion> {
        let body = serde_json::json!({
            "name": name,
            "version": version.to_string(),
            "stage": stage.as_str(),
            "archive_existing_versions": archive_existing_versions,
        });
        let response: ModelVersionResponse =
            self.registry_post("model-versions/transition-stage", &body)?;
        response.model_version.try_into()
    }

    fn set_model_version_tag(
        &self,
        name: &str,
        version: u64,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let body = serde_json::json!({
            "name": name,
            "version": version.to_string(),
            "key": key,
            "value": value,
        });
        self.registry_post::<Empty>("model-versions/set-tag", &body).map(|_| ())
    }

    fn get_model_version_download_uri(&self, name: &str, version: u64) -> Result<String> {
        let version = version.to_string();
        let response: DownloadUriResponse = self.registry_get(
            "model-versions/get-download-uri",
            &[("name", name), ("version", &version)],
        )?;
        Ok(response.artifact_uri)
    }
}
