//! Environment-scoped registry client
//!
//! [`EnvRegistryClient`] wraps a [`RegistryClient`] and pins every call to
//! one environment: model names get the environment postfix, experiments
//! live in the environment's folder, and registered versions are moved into
//! the environment's stage. Callers only ever pass base names.
//!
//! # Example
//!
//! ```
//! use entorno::client::EnvRegistryClient;
//! use entorno::environment::EnvironmentTable;
//! use entorno::registry::{InMemoryRegistryClient, ModelStage};
//!
//! let client = EnvRegistryClient::new(
//!     "prod",
//!     EnvironmentTable::default(),
//!     InMemoryRegistryClient::new(),
//! )
//! .unwrap();
//! assert_eq!(client.model_name("deepar").unwrap(), "deepar_prod");
//! assert_eq!(client.stage(), ModelStage::Production);
//! ```

mod error;

#[cfg(test)]
mod tests;

pub use error::{ClientError, Result};

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::environment::{Environment, EnvironmentTable, DEFAULT_EXPERIMENT_ROOT};
use crate::mlflow::MlflowRestClient;
use crate::registry::{
    ModelArtifact, ModelInfo, ModelStage, ModelVersion, NewModelVersion, RegisteredModel,
    RegistryClient, RunInfo, RunStatus, FLAVOR_TAG,
};

/// Registry client bound to a single deployment environment.
///
/// Holds no mutable state; names and stages are derived on each call.
#[derive(Debug)]
pub struct EnvRegistryClient<C: RegistryClient = MlflowRestClient> {
    env: Environment,
    table: EnvironmentTable,
    experiment_root: String,
    client: C,
}

impl EnvRegistryClient<MlflowRestClient> {
    /// Build a REST-backed client from configuration.
    ///
    /// The environment is validated before the HTTP client is created.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let name = config.environment_name()?;
        let env = resolve_for_construction(&config.environments, name)?;

        let endpoint = config.registry.endpoint()?;
        let client = MlflowRestClient::new(
            endpoint,
            config.registry.timeout(),
            &config.registry.user_agent,
        )
        .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(Self {
            env,
            table: config.environments.clone(),
            experiment_root: config.experiment_root.clone(),
            client,
        })
    }
}

impl<C: RegistryClient> EnvRegistryClient<C> {
    /// Bind `client` to `environment`.
    ///
    /// Fails with [`ClientError::Configuration`] when `environment` is not in
    /// `table`. The client is not called.
    pub fn new(environment: &str, table: EnvironmentTable, client: C) -> Result<Self> {
        let env = resolve_for_construction(&table, environment)?;
        Ok(Self { env, table, experiment_root: DEFAULT_EXPERIMENT_ROOT.to_string(), client })
    }

    /// Like [`new`](Self::new), with the rest of the settings taken from `config`
    pub fn with_client(config: &ClientConfig, client: C) -> Result<Self> {
        let name = config.environment_name()?;
        let env = resolve_for_construction(&config.environments, name)?;
        Ok(Self {
            env,
            table: config.environments.clone(),
            experiment_root: config.experiment_root.clone(),
            client,
        })
    }

    /// Place experiment folders under `root` instead of `/experiments`
    pub fn with_experiment_root(mut self, root: impl Into<String>) -> Self {
        self.experiment_root = root.into();
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Environment identifier
    pub fn env(&self) -> &str {
        self.env.name()
    }

    /// Stage this environment registers versions into
    pub fn stage(&self) -> ModelStage {
        self.env.stage()
    }

    /// Stage of any recognized environment
    pub fn stage_for(&self, environment: &str) -> Result<ModelStage> {
        Ok(self.table.stage_for(environment)?)
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    // -----------------------------------------------------------------------
    // Name derivation
    // -----------------------------------------------------------------------

    /// `{base}_{env}`
    pub fn model_name(&self, base: &str) -> Result<String> {
        Ok(self.env.model_name(base)?)
    }

    /// `{root}/{env}`
    pub fn experiment_folder(&self) -> String {
        self.env.experiment_folder(&self.experiment_root)
    }

    /// `{root}/{env}/{name}`
    pub fn experiment_name(&self, name: &str) -> Result<String> {
        Ok(self.env.experiment_name(&self.experiment_root, name)?)
    }

    // -----------------------------------------------------------------------
    // Model registry
    // -----------------------------------------------------------------------

    /// Log `artifact` under `run_id` and register it as a new version.
    ///
    /// The artifact path gets the environment postfix, the registered model
    /// is created when missing, and the new version is moved into this
    /// environment's stage without archiving existing versions.
    pub fn log_and_register_model(
        &self,
        run_id: &str,
        base: &str,
        artifact: &ModelArtifact,
    ) -> Result<(ModelVersion, ModelInfo)> {
        let name = self.model_name(base)?;
        let artifact =
            artifact.with_artifact_path(self.model_name(artifact.artifact_path.trim_matches('/'))?);

        let model_info = self
            .client
            .log_model(run_id, &artifact)
            .map_err(ClientError::registry("log_model", run_id))?;
        debug!(run_id, artifact_uri = %model_info.artifact_uri, "logged model artifact");

        self.ensure_registered_model(&name)?;

        let request = NewModelVersion::new(&name, &model_info.artifact_uri)
            .with_run_id(run_id)
            .with_tag(FLAVOR_TAG, &artifact.flavor);
        let created = self
            .client
            .create_model_version(&request)
            .map_err(ClientError::registry("create_model_version", &name))?;

        let version = self.transition_to_stage(&name, created.version)?;
        info!(
            model = %name,
            version = version.version,
            stage = %version.current_stage,
            "registered model version"
        );
        Ok((version, model_info))
    }

    /// Highest-numbered version, optionally restricted to one flavor
    pub fn get_latest_model_version(&self, base: &str, flavor: Option<&str>) -> Result<ModelVersion> {
        let name = self.model_name(base)?;
        let versions = self
            .client
            .search_model_versions(&name)
            .map_err(ClientError::registry("search_model_versions", &name))?;

        versions
            .into_iter()
            .filter(|mv| flavor.map_or(true, |f| mv.flavor() == Some(f)))
            .max_by_key(|mv| mv.version)
            .ok_or_else(|| ClientError::NotFound { name, flavor: flavor.map(String::from) })
    }

    /// All versions of the model, oldest first
    pub fn list_versions(&self, base: &str) -> Result<Vec<ModelVersion>> {
        let name = self.model_name(base)?;
        let mut versions = self
            .client
            .search_model_versions(&name)
            .map_err(ClientError::registry("search_model_versions", &name))?;
        versions.sort_by_key(|mv| mv.version);
        Ok(versions)
    }

    /// Latest version in this environment's stage
    pub fn get_latest_versions(&self, base: &str) -> Result<Vec<ModelVersion>> {
        let name = self.model_name(base)?;
        self.client
            .get_latest_versions(&name, &[self.stage()])
            .map_err(ClientError::registry("get_latest_versions", name))
    }

    pub fn get_model_version(&self, base: &str, version: u64) -> Result<ModelVersion> {
        let name = self.model_name(base)?;
        self.client
            .get_model_version(&name, version)
            .map_err(ClientError::registry("get_model_version", name))
    }

    pub fn get_registered_model(&self, base: &str) -> Result<RegisteredModel> {
        let name = self.model_name(base)?;
        self.client
            .get_registered_model(&name)
            .map_err(ClientError::registry("get_registered_model", name))
    }

    pub fn create_registered_model(
        &self,
        base: &str,
        tags: &HashMap<String, String>,
        description: Option<&str>,
    ) -> Result<RegisteredModel> {
        let name = self.model_name(base)?;
        self.client
            .create_registered_model(&name, tags, description)
            .map_err(ClientError::registry("create_registered_model", name))
    }

    /// Register `source` as a new version of the model (no stage change)
    pub fn create_model_version(
        &self,
        base: &str,
        source: &str,
        run_id: Option<&str>,
        tags: &HashMap<String, String>,
        description: Option<&str>,
    ) -> Result<ModelVersion> {
        let name = self.model_name(base)?;
        let mut request = NewModelVersion::new(&name, source);
        request.run_id = run_id.map(String::from);
        request.tags = tags.clone();
        request.description = description.map(String::from);
        self.client
            .create_model_version(&request)
            .map_err(ClientError::registry("create_model_version", name))
    }

    /// Move `version` into this environment's stage.
    ///
    /// Existing versions in that stage are left untouched.
    pub fn transition_model_version_stage(&self, base: &str, version: u64) -> Result<ModelVersion> {
        let name = self.model_name(base)?;
        self.transition_to_stage(&name, version)
    }

    pub fn set_model_version_tag(&self, base: &str, version: u64, key: &str, value: &str) -> Result<()> {
        let name = self.model_name(base)?;
        self.client
            .set_model_version_tag(&name, version, key, value)
            .map_err(ClientError::registry("set_model_version_tag", name))
    }

    pub fn set_registered_model_tag(&self, base: &str, key: &str, value: &str) -> Result<()> {
        let name = self.model_name(base)?;
        self.client
            .set_registered_model_tag(&name, key, value)
            .map_err(ClientError::registry("set_registered_model_tag", name))
    }

    pub fn get_model_version_download_uri(&self, base: &str, version: u64) -> Result<String> {
        let name = self.model_name(base)?;
        self.client
            .get_model_version_download_uri(&name, version)
            .map_err(ClientError::registry("get_model_version_download_uri", name))
    }

    /// Download URI of the latest version, optionally of one flavor
    pub fn get_latest_model_download_uri(&self, base: &str, flavor: Option<&str>) -> Result<String> {
        let latest = self.get_latest_model_version(base, flavor)?;
        self.client
            .get_model_version_download_uri(&latest.name, latest.version)
            .map_err(ClientError::registry("get_model_version_download_uri", latest.name))
    }

    fn ensure_registered_model(&self, name: &str) -> Result<()> {
        match self.client.create_registered_model(name, &HashMap::new(), None) {
            Ok(_) => {
                debug!(model = name, "created registered model");
                Ok(())
            }
            Err(e) if e.is_already_exists() => Ok(()),
            Err(e) => Err(ClientError::registry("create_registered_model", name)(e)),
        }
    }

    fn transition_to_stage(&self, name: &str, version: u64) -> Result<ModelVersion> {
        let stage = self.stage();
        let updated = self
            .client
            .transition_model_version_stage(name, version, stage, false)
            .map_err(ClientError::registry("transition_model_version_stage", name))?;
        info!(model = name, version, %stage, "transitioned model version");
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Experiment tracking
    // -----------------------------------------------------------------------

    /// Id of `{root}/{env}/{name}`, creating the experiment when missing
    pub fn create_experiment_if_not_exists(&self, name: &str) -> Result<String> {
        let full_name = self.experiment_name(name)?;
        match self.client.create_experiment(&full_name) {
            Ok(id) => {
                info!(experiment = %full_name, id = %id, "created experiment");
                Ok(id)
            }
            Err(e) if e.is_already_exists() => {
                debug!(experiment = %full_name, "experiment exists, looking it up");
                let existing = self
                    .client
                    .get_experiment_by_name(&full_name)
                    .map_err(ClientError::registry("get_experiment_by_name", &full_name))?;
                existing
                    .map(|experiment| experiment.experiment_id)
                    .ok_or(ClientError::Registry {
                        operation: "create_experiment",
                        target: full_name,
                        source: e,
                    })
            }
            Err(e) => Err(ClientError::registry("create_experiment", full_name)(e)),
        }
    }

    pub fn start_run(&self, experiment_id: &str, run_name: Option<&str>) -> Result<RunInfo> {
        self.client
            .create_run(experiment_id, run_name)
            .map_err(ClientError::registry("create_run", experiment_id))
    }

    pub fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.client
            .log_param(run_id, key, value)
            .map_err(ClientError::registry("log_param", run_id))
    }

    /// Record one metric value at `step`, stamped with the current time
    pub fn log_metric(&self, run_id: &str, key: &str, value: f64, step: u64) -> Result<()> {
        self.client
            .log_metric(run_id, key, value, Utc::now().timestamp_millis(), step)
            .map_err(ClientError::registry("log_metric", run_id))
    }

    /// Close the run with a terminal status
    pub fn end_run(&self, run_id: &str, status: RunStatus) -> Result<RunInfo> {
        if !status.is_terminal() {
            return Err(ClientError::InvalidArgument(format!(
                "run status {status} is not terminal"
            )));
        }
        self.client
            .update_run(run_id, status, Some(Utc::now().timestamp_millis()))
            .map_err(ClientError::registry("update_run", run_id))
    }
}

fn resolve_for_construction(table: &EnvironmentTable, name: &str) -> Result<Environment> {
    table.resolve(name).map_err(|e| ClientError::Configuration(e.to_string()))
}
