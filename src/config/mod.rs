//! Configuration: client settings and CLI arguments

pub mod cli;
mod client;

pub use cli::{
    apply_overrides, parse_args, Cli, Command, ExperimentArgs, LatestArgs, ModelArgs, NameArgs,
    OutputFormat, RegisterArgs, VersionArgs,
};
pub use client::{
    ClientConfig, ConfigError, RegistryConfig, Result, DATABRICKS_HOST_KEY, DATABRICKS_TOKEN_KEY,
    DATABRICKS_URI, ENVIRONMENT_KEY, REGISTRY_URI_KEY, TRACKING_PASSWORD_KEY, TRACKING_TOKEN_KEY,
    TRACKING_URI_KEY, TRACKING_USERNAME_KEY,
};
