//! In-memory registry client implementation

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use super::artifact::{ModelArtifact, ModelInfo};
use super::error::{RegistryError, Result, INVALID_PARAMETER_VALUE};
use super::experiment::{Experiment, RunInfo, RunStatus};
use super::stage::ModelStage;
use super::traits::RegistryClient;
use super::version::{ModelVersion, NewModelVersion, RegisteredModel};

#[derive(Debug, Default)]
struct State {
    experiments: Vec<Experiment>,
    runs: HashMap<String, RunInfo>,
    params: HashMap<String, HashMap<String, String>>,
    metrics: HashMap<String, HashMap<String, Vec<(f64, u64)>>>,
    /// run_id -> artifact paths relative to the run's artifact root
    artifacts: HashMap<String, Vec<String>>,
    models: BTreeMap<String, RegisteredModel>,
    /// model name -> version -> record
    versions: BTreeMap<String, BTreeMap<u64, ModelVersion>>,
    next_run: u64,
}

impl State {
    fn version(&self, name: &str, version: u64) -> Result<&ModelVersion> {
        self.versions
            .get(name)
            .and_then(|versions| versions.get(&version))
            .ok_or_else(|| version_not_found(name, version))
    }

    fn version_mut(&mut self, name: &str, version: u64) -> Result<&mut ModelVersion> {
        self.versions
            .get_mut(name)
            .and_then(|versions| versions.get_mut(&version))
            .ok_or_else(|| version_not_found(name, version))
    }

    fn latest_per_stage(&self, name: &str, stages: &[ModelStage]) -> Vec<ModelVersion> {
        let Some(versions) = self.versions.get(name) else {
            return Vec::new();
        };
        let stages: &[ModelStage] = if stages.is_empty() { &ModelStage::ALL } else { stages };
        stages
            .iter()
            .filter_map(|stage| {
                versions.values().filter(|mv| mv.current_stage == *stage).max_by_key(|mv| mv.version)
            })
            .cloned()
            .collect()
    }
}

fn version_not_found(name: &str, version: u64) -> RegistryError {
    RegistryError::not_found(format!("Model Version (name={name}, version={version}) not found"))
}

/// In-process registry for tests and dry runs.
///
/// Mirrors the tracking server's observable behavior: per-model version
/// numbers start at 1 and only grow, duplicate creation fails with
/// `RESOURCE_ALREADY_EXISTS` and lookups of missing entities fail with
/// `RESOURCE_DOES_NOT_EXIST`.
#[derive(Debug, Default)]
pub struct InMemoryRegistryClient {
    state: RwLock<State>,
    calls: AtomicUsize,
}

impl InMemoryRegistryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registry operations invoked so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Artifact paths logged under a run
    pub fn run_artifacts(&self, run_id: &str) -> Vec<String> {
        self.read().artifacts.get(run_id).cloned().unwrap_or_default()
    }

    /// Parameters logged under a run
    pub fn run_params(&self, run_id: &str) -> HashMap<String, String> {
        self.read().params.get(run_id).cloned().unwrap_or_default()
    }

    /// Metric history of a run as `(value, step)` pairs
    pub fn run_metric(&self, run_id: &str, key: &str) -> Vec<(f64, u64)> {
        self.read()
            .metrics
            .get(run_id)
            .and_then(|m| m.get(key))
            .cloned()
            .unwrap_or_default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counted read access for registry lookups
    fn lookup(&self) -> RwLockReadGuard<'_, State> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.read()
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RegistryClient for InMemoryRegistryClient {
    fn create_experiment(&self, name: &str) -> Result<String> {
        let mut state = self.write();
        if name.is_empty() {
            return Err(RegistryError::api(400, INVALID_PARAMETER_VALUE, "Experiment name must not be empty"));
        }
        if state.experiments.iter().any(|e| e.name == name) {
            return Err(RegistryError::already_exists(format!(
                "Experiment '{name}' already exists."
            )));
        }
        let experiment_id = (state.experiments.len() + 1).to_string();
        state.experiments.push(Experiment {
            experiment_id: experiment_id.clone(),
            name: name.to_string(),
            artifact_location: Some(format!("mlflow-artifacts:/{experiment_id}")),
            lifecycle_stage: "active".to_string(),
            tags: HashMap::new(),
        });
        Ok(experiment_id)
    }

    fn get_experiment_by_name(&self, name: &str) -> Result<Option<Experiment>> {
        let state = self.lookup();
        Ok(state.experiments.iter().find(|e| e.name == name).cloned())
    }

    fn create_run(&self, experiment_id: &str, run_name: Option<&str>) -> Result<RunInfo> {
        let mut state = self.write();
        if !state.experiments.iter().any(|e| e.experiment_id == experiment_id) {
            return Err(RegistryError::not_found(format!(
                "No Experiment with id={experiment_id} exists"
            )));
        }
        state.next_run += 1;
        let run_id = format!("run-{}", state.next_run);
        let run = RunInfo {
            run_id: run_id.clone(),
            experiment_id: experiment_id.to_string(),
            run_name: run_name.map(String::from),
            status: RunStatus::Running,
            start_time: Some(Utc::now().timestamp_millis()),
            end_time: None,
            artifact_uri: format!("mlflow-artifacts:/{experiment_id}/{run_id}/artifacts"),
        };
        state.runs.insert(run_id, run.clone());
        Ok(run)
    }

    fn get_run(&self, run_id: &str) -> Result<RunInfo> {
        let state = self.lookup();
        state
            .runs
            .get(run_id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found(format!("Run '{run_id}' not found")))
    }

    fn update_run(
        &self,
        run_id: &str,
        status: RunStatus,
        end_time: Option<i64>,
    ) -> Result<RunInfo> {
        let mut state = self.write();
        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| RegistryError::not_found(format!("Run '{run_id}' not found")))?;
        run.status = status;
        if end_time.is_some() {
            run.end_time = end_time;
        }
        Ok(run.clone())
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        let mut state = self.write();
        if !state.runs.contains_key(run_id) {
            return Err(RegistryError::not_found(format!("Run '{run_id}' not found")));
        }
        state
            .params
            .entry(run_id.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn log_metric(
        &self,
        run_id: &str,
        key: &str,
        value: f64,
        _timestamp: i64,
        step: u64,
    ) -> Result<()> {
        let mut state = self.write();
        if !state.runs.contains_key(run_id) {
            return Err(RegistryError::not_found(format!("Run '{run_id}' not found")));
        }
        state
            .metrics
            .entry(run_id.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default()
            .push((value, step));
        Ok(())
    }

    fn log_model(&self, run_id: &str, artifact: &ModelArtifact) -> Result<ModelInfo> {
        let files = artifact.files()?;
        let mut state = self.write();
        let run = state
            .runs
            .get(run_id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found(format!("Run '{run_id}' not found")))?;

        let logged = state.artifacts.entry(run_id.to_string()).or_default();
        for (_, relative) in &files {
            logged.push(format!("{}/{relative}", artifact.artifact_path));
        }
        logged.push(format!("{}/MLmodel", artifact.artifact_path));

        Ok(ModelInfo::new(&run, artifact))
    }

    fn create_registered_model(
        &self,
        name: &str,
        tags: &HashMap<String, String>,
        description: Option<&str>,
    ) -> Result<RegisteredModel> {
        let mut state = self.write();
        if name.is_empty() {
            return Err(RegistryError::api(400, INVALID_PARAMETER_VALUE, "Registered model name must not be empty"));
        }
        if state.models.contains_key(name) {
            return Err(RegistryError::already_exists(format!(
                "Registered Model (name={name}) already exists."
            )));
        }
        let mut model = RegisteredModel::new(name);
        model.tags = tags.clone();
        model.description = description.map(String::from);
        state.models.insert(name.to_string(), model.clone());
        Ok(model)
    }

    fn get_registered_model(&self, name: &str) -> Result<RegisteredModel> {
        let state = self.lookup();
        let mut model = state.models.get(name).cloned().ok_or_else(|| {
            RegistryError::not_found(format!("Registered Model with name={name} not found"))
        })?;
        model.latest_versions = state.latest_per_stage(name, &[]);
        Ok(model)
    }

    fn set_registered_model_tag(&self, name: &str, key: &str, value: &str) -> Result<()> {
        let mut state = self.write();
        let model = state.models.get_mut(name).ok_or_else(|| {
            RegistryError::not_found(format!("Registered Model with name={name} not found"))
        })?;
        model.tags.insert(key.to_string(), value.to_string());
        model.last_updated_timestamp = Utc::now().timestamp_millis();
        Ok(())
    }

    fn create_model_version(&self, request: &NewModelVersion) -> Result<ModelVersion> {
        let mut state = self.write();
        if !state.models.contains_key(&request.name) {
            return Err(RegistryError::not_found(format!(
                "Registered Model with name={} not found",
                request.name
            )));
        }

        let versions = state.versions.entry(request.name.clone()).or_default();
        let version = versions.keys().max().copied().unwrap_or(0) + 1;

        let mut mv = ModelVersion::new(&request.name, version, &request.source);
        mv.run_id = request.run_id.clone();
        mv.tags = request.tags.clone();
        mv.run_link = request.run_link.clone();
        mv.description = request.description.clone();
        versions.insert(version, mv.clone());
        Ok(mv)
    }

    fn get_model_version(&self, name: &str, version: u64) -> Result<ModelVersion> {
        self.lookup().version(name, version).cloned()
    }

    fn search_model_versions(&self, name: &str) -> Result<Vec<ModelVersion>> {
        let state = self.lookup();
        Ok(state
            .versions
            .get(name)
            .map(|versions| versions.values().rev().cloned().collect())
            .unwrap_or_default())
    }

    fn get_latest_versions(&self, name: &str, stages: &[ModelStage]) -> Result<Vec<ModelVersion>> {
        let state = self.lookup();
        if !state.models.contains_key(name) {
            return Err(RegistryError::not_found(format!(
                "Registered Model with name={name} not found"
            )));
        }
        Ok(state.latest_per_stage(name, stages))
    }

    fn transition_model_version_stage(
        &self,
        name: &str,
        version: u64,
        stage: ModelStage,
        archive_existing_versions: bool,
    ) -> Result<ModelVersion> {
        let mut state = self.write();
        let now = Utc::now().timestamp_millis();

        let mv = state.version_mut(name, version)?;
        mv.current_stage = stage;
        mv.last_updated_timestamp = now;
        let updated = mv.clone();

        if archive_existing_versions {
            if let Some(versions) = state.versions.get_mut(name) {
                for other in versions.values_mut() {
                    if other.version != version && other.current_stage == stage {
                        other.current_stage = ModelStage::Archived;
                        other.last_updated_timestamp = now;
                    }
                }
            }
        }
        Ok(updated)
    }

    fn set_model_version_tag(
        &self,
        name: &str,
        version: u64,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let mut state = self.write();
        let mv = state.version_mut(name, version)?;
        mv.tags.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_model_version_download_uri(&self, name: &str, version: u64) -> Result<String> {
        self.lookup().version(name, version).map(|mv| mv.source.clone())
    }
}
