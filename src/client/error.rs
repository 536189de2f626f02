//! Error types for the environment-scoped client

use thiserror::Error;

use crate::config::ConfigError;
use crate::environment::EnvironmentError;
use crate::registry::RegistryError;

/// Errors surfaced by [`EnvRegistryClient`](super::EnvRegistryClient)
#[derive(Debug, Error)]
pub enum ClientError {
    /// Client could not be constructed
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown environment '{name}' (known: {known})")]
    UnknownEnvironment { name: String, known: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No version of the model matched the query
    #[error(
        "No versions found for model '{name}'{}",
        .flavor.as_deref().map(|f| format!(" with flavor '{f}'")).unwrap_or_default()
    )]
    NotFound { name: String, flavor: Option<String> },

    /// The registry rejected or failed an operation
    #[error("Registry operation {operation} failed for '{target}': {source}")]
    Registry {
        operation: &'static str,
        target: String,
        #[source]
        source: RegistryError,
    },
}

impl ClientError {
    pub(crate) fn registry(
        operation: &'static str,
        target: impl Into<String>,
    ) -> impl FnOnce(RegistryError) -> Self {
        let target = target.into();
        move |source| Self::Registry { operation, target, source }
    }

    /// Underlying registry error, if any
    pub fn registry_error(&self) -> Option<&RegistryError> {
        match self {
            Self::Registry { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<EnvironmentError> for ClientError {
    fn from(err: EnvironmentError) -> Self {
        match err {
            EnvironmentError::Unknown { name, known } => Self::UnknownEnvironment { name, known },
            invalid @ EnvironmentError::InvalidName { .. } => Self::InvalidArgument(invalid.to_string()),
        }
    }
}

impl From<ConfigError> for ClientError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
