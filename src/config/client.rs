//! Client configuration: environment table, experiment root, registry endpoint
//!
//! Values come from three layers, later ones winning: a YAML file,
//! environment variables, then explicit overrides (CLI flags).
//!
//! ```yaml
//! environment: acc
//! experiment_root: /experiments
//! environments:
//!   acc: Staging
//!   prod: Production
//! registry:
//!   tracking_uri: http://mlflow.internal:5000
//!   timeout_secs: 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::environment::{EnvironmentTable, DEFAULT_EXPERIMENT_ROOT};
use crate::mlflow::{Auth, Endpoint};

/// Selects the logical environment when none is passed explicitly
pub const ENVIRONMENT_KEY: &str = "MLFLOW_ENV";
pub const TRACKING_URI_KEY: &str = "MLFLOW_TRACKING_URI";
pub const REGISTRY_URI_KEY: &str = "MLFLOW_REGISTRY_URI";
pub const TRACKING_TOKEN_KEY: &str = "MLFLOW_TRACKING_TOKEN";
pub const TRACKING_USERNAME_KEY: &str = "MLFLOW_TRACKING_USERNAME";
pub const TRACKING_PASSWORD_KEY: &str = "MLFLOW_TRACKING_PASSWORD";
pub const DATABRICKS_HOST_KEY: &str = "DATABRICKS_HOST";
pub const DATABRICKS_TOKEN_KEY: &str = "DATABRICKS_TOKEN";

/// Tracking URI value that selects Databricks-hosted MLflow
pub const DATABRICKS_URI: &str = "databricks";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("No environment selected: pass an environment name or set MLFLOW_ENV")]
    MissingEnvironment,

    #[error("No tracking URI configured: set registry.tracking_uri or MLFLOW_TRACKING_URI")]
    MissingTrackingUri,

    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: &'static str },

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Connection settings for the tracking server and model registry
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// `http(s)://host[:port]` or `databricks`
    pub tracking_uri: Option<String>,
    /// Defaults to the tracking URI
    pub registry_uri: Option<String>,
    /// Bearer token (if not set, resolved from env)
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Workspace URL used when the tracking URI is `databricks`
    pub databricks_host: Option<String>,
    #[serde(skip_serializing)]
    pub databricks_token: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            tracking_uri: None,
            registry_uri: None,
            token: None,
            username: None,
            password: None,
            databricks_host: None,
            databricks_token: None,
            timeout_secs: 60,
            user_agent: concat!("entorno/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl std::fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("tracking_uri", &self.tracking_uri)
            .field("registry_uri", &self.registry_uri)
            .field("has_token", &self.token.is_some())
            .field("username", &self.username)
            .field("databricks_host", &self.databricks_host)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve base URLs and credentials.
    pub fn endpoint(&self) -> Result<Endpoint> {
        let tracking = self
            .tracking_uri
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
            .ok_or(ConfigError::MissingTrackingUri)?;

        if is_databricks(tracking) {
            let host = self
                .databricks_host
                .as_deref()
                .ok_or(ConfigError::MissingCredential(DATABRICKS_HOST_KEY))?;
            let host = normalize_http_uri(host)?;
            let token = self
                .databricks_token
                .clone()
                .or_else(|| self.token.clone())
                .ok_or(ConfigError::MissingCredential(DATABRICKS_TOKEN_KEY))?;
            let registry = match self.registry_uri.as_deref() {
                Some(uri) if !is_databricks(uri) => normalize_http_uri(uri)?,
                _ => host.clone(),
            };
            return Ok(Endpoint { tracking_uri: host, registry_uri: registry, auth: Auth::Bearer(token) });
        }

        let tracking_uri = normalize_http_uri(tracking)?;
        let registry_uri = match self.registry_uri.as_deref() {
            Some(uri) if !uri.trim().is_empty() => normalize_http_uri(uri)?,
            _ => tracking_uri.clone(),
        };

        let auth = match (&self.token, &self.username, &self.password) {
            (Some(token), _, _) => Auth::Bearer(token.clone()),
            (None, Some(username), Some(password)) => {
                Auth::Basic { username: username.clone(), password: password.clone() }
            }
            (None, Some(_), None) => return Err(ConfigError::MissingCredential(TRACKING_PASSWORD_KEY)),
            (None, None, Some(_)) => return Err(ConfigError::MissingCredential(TRACKING_USERNAME_KEY)),
            (None, None, None) => Auth::None,
        };

        Ok(Endpoint { tracking_uri, registry_uri, auth })
    }
}

fn is_databricks(uri: &str) -> bool {
    uri == DATABRICKS_URI || uri.starts_with("databricks://")
}

fn normalize_http_uri(uri: &str) -> Result<String> {
    let trimmed = uri.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or(ConfigError::InvalidUri {
            uri: uri.to_string(),
            reason: "expected an http:// or https:// URL",
        })?;
    if rest.is_empty() {
        return Err(ConfigError::InvalidUri { uri: uri.to_string(), reason: "missing host" });
    }
    Ok(trimmed.to_string())
}

/// Full client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Environment identifier; falls back to `MLFLOW_ENV`
    pub environment: Option<String>,
    /// Prefix of the per-environment experiment folders
    pub experiment_root: String,
    /// Recognized environments and their stages
    pub environments: EnvironmentTable,
    pub registry: RegistryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment: None,
            experiment_root: DEFAULT_EXPERIMENT_ROOT.to_string(),
            environments: EnvironmentTable::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults for the given environment
    pub fn for_environment(environment: impl Into<String>) -> Self {
        Self { environment: Some(environment.into()), ..Self::default() }
    }

    /// Load a YAML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_yaml(&content)
            .map_err(|message| ConfigError::Parse { path: path.to_path_buf(), message })
    }

    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, String> {
        serde_yaml::from_str(yaml).map_err(|e| e.to_string())
    }

    /// Defaults overlaid with the process environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`; empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENVIRONMENT_KEY) {
            self.environment = Some(v);
        }
        let registry = &mut self.registry;
        for (key, slot) in [
            (TRACKING_URI_KEY, &mut registry.tracking_uri),
            (REGISTRY_URI_KEY, &mut registry.registry_uri),
            (TRACKING_TOKEN_KEY, &mut registry.token),
            (TRACKING_USERNAME_KEY, &mut registry.username),
            (TRACKING_PASSWORD_KEY, &mut registry.password),
            (DATABRICKS_HOST_KEY, &mut registry.databricks_host),
            (DATABRICKS_TOKEN_KEY, &mut registry.databricks_token),
        ] {
            if let Some(v) = get(key) {
                *slot = Some(v);
            }
        }
    }

    /// Selected environment identifier
    pub fn environment_name(&self) -> Result<&str> {
        self.environment
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or(ConfigError::MissingEnvironment)
    }
}
