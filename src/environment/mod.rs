//! Logical deployment environments
//!
//! Several environments (acc, preprod, prod, ...) share one registry. Each
//! one gets its own model namespace (`{base}_{env}`), its own experiment
//! folder (`{root}/{env}`) and a fixed registry stage for the versions it
//! registers.
//!
//! Everything here is pure: names and stages are derived on every call from
//! the environment identifier and the caller's input.
//!
//! # Example
//!
//! ```
//! use entorno::environment::EnvironmentTable;
//! use entorno::registry::ModelStage;
//!
//! let table = EnvironmentTable::default();
//! let env = table.resolve("prod").expect("prod is a known environment");
//! assert_eq!(env.stage(), ModelStage::Production);
//! assert_eq!(env.model_name("deepar").unwrap(), "deepar_prod");
//! ```


use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::ModelStage;

/// Default prefix under which environment experiment folders live
pub const DEFAULT_EXPERIMENT_ROOT: &str = "/experiments";

/// Errors from environment resolution and name derivation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvironmentError {
    /// Identifier is not in the environment table
    #[error("unknown environment '{name}' (known: {known})")]
    Unknown { name: String, known: String },

    /// Base name or identifier is empty or malformed
    #[error("invalid {what} '{value}': {reason}")]
    InvalidName { what: &'static str, value: String, reason: &'static str },
}

/// Result type for environment operations
pub type Result<T> = std::result::Result<T, EnvironmentError>;

/// Recognized environment identifiers and the stage each one registers into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentTable {
    stages: BTreeMap<String, ModelStage>,
}

impl Default for EnvironmentTable {
    /// Production for `prod`/`production`, Staging for every other known env.
    fn default() -> Self {
        let mut table = Self::empty();
        for name in ["local", "dev", "test", "acc", "preprod"] {
            table.insert(name, ModelStage::Staging);
        }
        for name in ["prod", "production"] {
            table.insert(name, ModelStage::Production);
        }
        table
    }
}

impl EnvironmentTable {
    /// A table recognizing no environments
    pub fn empty() -> Self {
        Self { stages: BTreeMap::new() }
    }

    /// Recognize `name`, registering into `stage`
    pub fn insert(&mut self, name: impl Into<String>, stage: ModelStage) {
        self.stages.insert(name.into(), stage);
    }

    pub fn with(mut self, name: impl Into<String>, stage: ModelStage) -> Self {
        self.insert(name, stage);
        self
    }

    /// Stage for an environment identifier.
    pub fn stage_for(&self, name: &str) -> Result<ModelStage> {
        self.stages.get(name).copied().ok_or_else(|| EnvironmentError::Unknown {
            name: name.to_string(),
            known: self.known(),
        })
    }

    /// Validate `name` against the table.
    pub fn resolve(&self, name: &str) -> Result<Environment> {
        validate_name("environment", name)?;
        let stage = self.stage_for(name)?;
        Ok(Environment { name: name.to_string(), stage })
    }

    /// Recognized identifiers, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    fn known(&self) -> String {
        self.names().collect::<Vec<_>>().join(", ")
    }
}

/// A recognized environment and its registry stage.
///
/// Only obtainable through [`EnvironmentTable::resolve`], so an
/// `Environment` always maps to exactly one stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Environment {
    name: String,
    stage: ModelStage,
}

impl Environment {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage versions registered from this environment are moved into
    pub fn stage(&self) -> ModelStage {
        self.stage
    }

    /// Environment-scoped model name: `{base}_{env}`
    pub fn model_name(&self, base: &str) -> Result<String> {
        namespaced_name(&self.name, base)
    }

    /// Experiment folder of this environment: `{root}/{env}`
    pub fn experiment_folder(&self, root: &str) -> String {
        format!("{}/{}", root.trim_end_matches('/'), self.name)
    }

    /// Full experiment name inside this environment's folder
    pub fn experiment_name(&self, root: &str, name: &str) -> Result<String> {
        validate_name("experiment name", name)?;
        if name.split('/').any(|segment| segment.is_empty() || segment == "..") {
            return Err(EnvironmentError::InvalidName {
                what: "experiment name",
                value: name.to_string(),
                reason: "must be a relative path without empty or '..' segments",
            });
        }
        Ok(format!("{}/{name}", self.experiment_folder(root)))
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Namespace `base` into environment `env`.
///
/// The separator is fixed, so for a given `env` distinct base names never
/// produce the same result.
pub fn namespaced_name(env: &str, base: &str) -> Result<String> {
    validate_name("model name", base)?;
    Ok(format!("{base}_{env}"))
}

fn validate_name(what: &'static str, value: &str) -> Result<()> {
    let reason = if value.is_empty() {
        "must not be empty"
    } else if value.trim().is_empty() {
        "must not be blank"
    } else if value.trim() != value {
        "must not have leading or trailing whitespace"
    } else if value.chars().any(char::is_control) {
        "must not contain control characters"
    } else {
        return Ok(());
    };
    Err(EnvironmentError::InvalidName { what, value: value.to_string(), reason })
}
