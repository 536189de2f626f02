//! Entorno: environment-aware model registry client
//!
//! Several deployment environments (acc, preprod, prod, ...) often share a
//! single MLflow tracking server and model registry. This crate keeps them
//! apart without every caller having to remember the conventions:
//!
//! - model names are postfixed with the environment (`deepar` → `deepar_prod`)
//! - experiments live under `/experiments/{env}/`
//! - versions registered from an environment go to that environment's stage
//!   (`Production` for prod, `Staging` elsewhere)
//!
//! # Modules
//!
//! - [`environment`]: environment table, name and stage derivation
//! - [`registry`]: registry domain types, the [`RegistryClient`](registry::RegistryClient)
//!   seam and an in-memory implementation
//! - [`mlflow`]: blocking REST client for the MLflow 2.0 API
//! - [`client`]: the environment-scoped [`EnvRegistryClient`]
//! - [`config`]: YAML/env configuration and CLI arguments
//! - [`cli`]: command handlers for the `entorno` binary

pub mod cli;
pub mod client;
pub mod config;
pub mod environment;
pub mod mlflow;
pub mod registry;

pub use client::{ClientError, EnvRegistryClient};
pub use config::ClientConfig;
pub use environment::{Environment, EnvironmentTable};
pub use registry::{ModelArtifact, ModelStage, ModelVersion, RegistryClient};
