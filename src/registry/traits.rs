//! Registry client trait definition

use std::collections::HashMap;

use super::artifact::{ModelArtifact, ModelInfo};
use super::error::Result;
use super::experiment::{Experiment, RunInfo, RunStatus};
use super::stage::ModelStage;
use super::version::{ModelVersion, NewModelVersion, RegisteredModel};

/// Operations consumed from the external tracking/registry service.
///
/// Names passed here are used verbatim; environment scoping happens in
/// [`EnvRegistryClient`](crate::client::EnvRegistryClient).
pub trait RegistryClient: Send + Sync {
    /// Create an experiment, returning its id
    fn create_experiment(&self, name: &str) -> Result<String>;

    /// Look up an experiment by its full name
    fn get_experiment_by_name(&self, name: &str) -> Result<Option<Experiment>>;

    /// Start a run in an experiment
    fn create_run(&self, experiment_id: &str, run_name: Option<&str>) -> Result<RunInfo>;

    fn get_run(&self, run_id: &str) -> Result<RunInfo>;

    /// Set a run's status (and end time, for terminal statuses)
    fn update_run(&self, run_id: &str, status: RunStatus, end_time: Option<i64>)
        -> Result<RunInfo>;

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    fn log_metric(&self, run_id: &str, key: &str, value: f64, timestamp: i64, step: u64)
        -> Result<()>;

    /// Upload a model directory under the run and record its MLmodel metadata
    fn log_model(&self, run_id: &str, artifact: &ModelArtifact) -> Result<ModelInfo>;

    fn create_registered_model(
        &self,
        name: &str,
        tags: &HashMap<String, String>,
        description: Option<&str>,
    ) -> Result<RegisteredModel>;

    fn get_registered_model(&self, name: &str) -> Result<RegisteredModel>;

    fn set_registered_model_tag(&self, name: &str, key: &str, value: &str) -> Result<()>;

    fn create_model_version(&self, request: &NewModelVersion) -> Result<ModelVersion>;

    fn get_model_version(&self, name: &str, version: u64) -> Result<ModelVersion>;

    /// All versions of a registered model, in server order
    fn search_model_versions(&self, name: &str) -> Result<Vec<ModelVersion>>;

    /// Latest version per requested stage
    fn get_latest_versions(&self, name: &str, stages: &[ModelStage]) -> Result<Vec<ModelVersion>>;

    fn transition_model_version_stage(
        &self,
        name: &str,
        version: u64,
        stage: ModelStage,
        archive_existing_versions: bool,
    ) -> Result<ModelVersion>;

    fn set_model_version_tag(&self, name: &str, version: u64, key: &str, value: &str)
        -> Result<()>;

    /// Location the version's artifacts can be downloaded from
    fn get_model_version_download_uri(&self, name: &str, version: u64) -> Result<String>;
}

/// Share one registry between several clients
impl<T: RegistryClient + ?Sized> RegistryClient for &T {
    fn create_experiment(&self, name: &str) -> Result<String> {
        (**self).create_experiment(name)
    }

    fn get_experiment_by_name(&self, name: &str) -> Result<Option<Experiment>> {
        (**self).get_experiment_by_name(name)
    }

    fn create_run(&self, experiment_id: &str, run_name: Option<&str>) -> Result<RunInfo> {
        (**self).create_run(experiment_id, run_name)
    }

    fn get_run(&self, run_id: &str) -> Result<RunInfo> {
        (**self).get_run(run_id)
    }

    fn update_run(&self, run_id: &str, status: RunStatus, end_time: Option<i64>)
        -> Result<RunInfo> {
        (**self).update_run(run_id, status, end_time)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        (**self).log_param(run_id, key, value)
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64, timestamp: i64, step: u64)
        -> Result<()> {
        (**self).log_metric(run_id, key, value, timestamp, step)
    }

    fn log_model(&self, run_id: &str, artifact: &ModelArtifact) -> Result<ModelInfo> {
        (**self).log_model(run_id, artifact)
    }

    fn create_registered_model(
        &self,
        name: &str,
        tags: &HashMap<String, String>,
        description: Option<&str>,
    ) -> Result<RegisteredModel> {
        (**self).create_registered_model(name, tags, description)
    }

    fn get_registered_model(&self, name: &str) -> Result<RegisteredModel> {
        (**self).get_registered_model(name)
    }

    fn set_registered_model_tag(&self, name: &str, key: &str, value: &str) -> Result<()> {
        (**self).set_registered_model_tag(name, key, value)
    }

    fn create_model_version(&self, request: &NewModelVersion) -> Result<ModelVersion> {
        (**self).create_model_version(request)
    }

    fn get_model_version(&self, name: &str, version: u64) -> Result<ModelVersion> {
        (**self).get_model_version(name, version)
    }

    fn search_model_versions(&self, name: &str) -> Result<Vec<ModelVersion>> {
        (**self).search_model_versions(name)
    }

    fn get_latest_versions(&self, name: &str, stages: &[ModelStage]) -> Result<Vec<ModelVersion>> {
        (**self).get_latest_versions(name, stages)
    }

    fn transition_model_version_stage(
        &self,
        name: &str,
        version: u64,
        stage: ModelStage,
        archive_existing_versions: bool,
    ) -> Result<ModelVersion> {
        (**self).transition_model_version_stage(name, version, stage, archive_existing_versions)
    }

    fn set_model_version_tag(&self, name: &str, version: u64, key: &str, value: &str)
        -> Result<()> {
        (**self).set_model_version_tag(name, version, key, value)
    }

    fn get_model_version_download_uri(&self, name: &str, version: u64) -> Result<String> {
        (**self).get_model_version_download_uri(name, version)
    }
}
