//! Experiment folder command

use serde_json::json;

use super::output::to_json;
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::client::EnvRegistryClient;
use crate::config::{ExperimentArgs, OutputFormat};
use crate::registry::RegistryClient;

pub(super) fn run_experiment<C: RegistryClient>(
    client: &EnvRegistryClient<C>,
    args: &ExperimentArgs,
    format: OutputFormat,
    log_level: LogLevel,
) -> Result<String, String> {
    let name = client.experiment_name(&args.name).map_err(|e| e.to_string())?;
    log(log_level, LogLevel::Verbose, &format!("Resolving experiment {name}"));

    let experiment_id = client
        .create_experiment_if_not_exists(&args.name)
        .map_err(|e| format!("Failed to resolve experiment: {e}"))?;

    match format {
        OutputFormat::Json => to_json(&json!({
            "name": name,
            "experiment_id": experiment_id,
        })),
        OutputFormat::Text => Ok(experiment_id),
    }
}
