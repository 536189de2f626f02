//! Core CLI types - Cli, Command, and per-command argument structs

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use super::types::OutputFormat;
use crate::config::ClientConfig;

/// Entorno: environment-aware model registry client
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "entorno")]
#[command(author = "PAIML")]
#[command(version)]
#[command(about = "Environment-scoped model registry and experiment tracking client")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Environment identifier (overrides MLFLOW_ENV)
    #[arg(short, long, global = true)]
    pub env: Option<String>,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Tracking server URI (overrides MLFLOW_TRACKING_URI)
    #[arg(long, global = true)]
    pub tracking_uri: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the namespaced model name for a base name
    Name(NameArgs),

    /// Print the registry stage of the environment
    Stage,

    /// Create the environment's experiment if missing and print its id
    Experiment(ExperimentArgs),

    /// List all versions of a model
    Versions(ModelArgs),

    /// Show the latest version of a model
    Latest(LatestArgs),

    /// Log a model directory to a run and register it.
    ///
    /// Without --run-id a run is started in the environment's experiment
    /// folder and ended once registration completes.
    Register(RegisterArgs),

    /// Move a version into the environment's stage
    Transition(VersionArgs),

    /// Print the download URI of a model version
    DownloadUri(VersionArgs),
}

/// Arguments for the name command
#[derive(Args, Debug, Clone, PartialEq)]
pub struct NameArgs {
    /// Base model name
    pub base: String,
}

/// Arguments for the experiment command
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ExperimentArgs {
    /// Experiment name below the environment folder
    pub name: String,
}

/// Arguments for commands that take only a base model name
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ModelArgs {
    /// Base model name
    pub base: String,
}

/// Arguments for the latest command
#[derive(Args, Debug, Clone, PartialEq)]
pub struct LatestArgs {
    /// Base model name
    pub base: String,

    /// Only consider versions of this flavor
    #[arg(long)]
    pub flavor: Option<String>,
}

/// Arguments for the register command
#[derive(Args, Debug, Clone, PartialEq)]
pub struct RegisterArgs {
    /// Base model name
    pub base: String,

    /// Existing run to log the model under
    #[arg(long)]
    pub run_id: Option<String>,

    /// Experiment for the run started when --run-id is omitted (defaults to the base name)
    #[arg(long, conflicts_with = "run_id")]
    pub experiment: Option<String>,

    /// Directory holding the serialized model
    #[arg(long)]
    pub model_dir: PathBuf,

    /// Model flavor (e.g. pyfunc, sklearn, onnx)
    #[arg(long)]
    pub flavor: String,

    /// Artifact path inside the run (defaults to the base name)
    #[arg(long)]
    pub artifact_path: Option<String>,
}

/// Arguments for commands addressing a single version
#[derive(Args, Debug, Clone, PartialEq)]
pub struct VersionArgs {
    /// Base model name
    pub base: String,

    /// Version number
    pub version: u64,
}

/// Parse CLI arguments from an iterator
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply CLI overrides on top of a loaded configuration
pub fn apply_overrides(config: &mut ClientConfig, cli: &Cli) {
    if let Some(env) = &cli.env {
        config.environment = Some(env.clone());
    }
    if let Some(uri) = &cli.tracking_uri {
        config.registry.tracking_uri = Some(uri.clone());
    }
}
