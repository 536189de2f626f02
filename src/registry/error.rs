//! Registry error types

use thiserror::Error;

/// Error code the tracking server uses for missing entities.
pub const RESOURCE_DOES_NOT_EXIST: &str = "RESOURCE_DOES_NOT_EXIST";
/// Error code the tracking server uses for duplicate creation.
pub const RESOURCE_ALREADY_EXISTS: &str = "RESOURCE_ALREADY_EXISTS";
/// Error code the tracking server uses for malformed requests.
pub const INVALID_PARAMETER_VALUE: &str = "INVALID_PARAMETER_VALUE";

/// Failures reported by a [`RegistryClient`](super::RegistryClient).
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Transport failure (connection refused, timeout, TLS)
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// The server answered with an error payload
    #[error("{code} (HTTP {status}): {message}")]
    Api { status: u16, code: String, message: String },

    /// The server answered with a body we could not interpret
    #[error("Failed to decode registry response: {message}")]
    Decode { message: String },

    /// Artifact location cannot be written through the tracking server
    #[error("Unsupported artifact URI: {uri} (only mlflow-artifacts:/ locations can be uploaded)")]
    UnsupportedArtifactUri { uri: String },

    /// Local model directory is missing or empty
    #[error("Invalid model artifact: {message}")]
    InvalidArtifact { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    /// Build an API error with the given server error code.
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api { status, code: code.into(), message: message.into() }
    }

    /// Entity does not exist on the server
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::api(404, RESOURCE_DOES_NOT_EXIST, message)
    }

    /// Entity was already created
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::api(400, RESOURCE_ALREADY_EXISTS, message)
    }

    /// Server error code, if this came from an error payload.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status, code, .. } => code == RESOURCE_DOES_NOT_EXIST || *status == 404,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        self.code() == Some(RESOURCE_ALREADY_EXISTS)
    }
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
