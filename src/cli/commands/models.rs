//! Model registry commands: versions, latest, register, transition, download-uri

use serde_json::json;

use super::output::{to_json, version_detail, version_table};
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::client::EnvRegistryClient;
use crate::config::{LatestArgs, ModelArgs, OutputFormat, RegisterArgs, VersionArgs};
use crate::registry::{ModelArtifact, RegistryClient, RunStatus};

pub(super) fn run_versions<C: RegistryClient>(
    client: &EnvRegistryClient<C>,
    args: &ModelArgs,
    format: OutputFormat,
) -> Result<String, String> {
    let versions = client
        .list_versions(&args.base)
        .map_err(|e| format!("Failed to list versions: {e}"))?;

    match format {
        OutputFormat::Json => to_json(&versions),
        OutputFormat::Text if versions.is_empty() => {
            let name = client.model_name(&args.base).map_err(|e| e.to_string())?;
            Ok(format!("No versions found for {name}"))
        }
        OutputFormat::Text => Ok(version_table(&versions)),
    }
}

pub(super) fn run_latest<C: RegistryClient>(
    client: &EnvRegistryClient<C>,
    args: &LatestArgs,
    format: OutputFormat,
) -> Result<String, String> {
    let latest = client
        .get_latest_model_version(&args.base, args.flavor.as_deref())
        .map_err(|e| e.to_string())?;

    match format {
        OutputFormat::Json => to_json(&latest),
        OutputFormat::Text => Ok(version_detail(&latest)),
    }
}

pub(super) fn run_register<C: RegistryClient>(
    client: &EnvRegistryClient<C>,
    args: &RegisterArgs,
    format: OutputFormat,
    log_level: LogLevel,
) -> Result<String, String> {
    if !args.model_dir.is_dir() {
        return Err(format!("Model directory not found: {}", args.model_dir.display()));
    }

    let artifact_path = args.artifact_path.as_deref().unwrap_or(&args.base);
    let artifact = ModelArtifact::new(artifact_path, &args.flavor, &args.model_dir);

    let name = client.model_name(&args.base).map_err(|e| e.to_string())?;

    let (version, info) = match &args.run_id {
        Some(run_id) => {
            log(
                log_level,
                LogLevel::Normal,
                &format!("Registering {name} from {} under run {run_id}", args.model_dir.display()),
            );
            client
                .log_and_register_model(run_id, &args.base, &artifact)
                .map_err(|e| format!("Registration failed: {e}"))?
        }
        None => {
            let experiment = args.experiment.as_deref().unwrap_or(&args.base);
            let experiment_id = client
                .create_experiment_if_not_exists(experiment)
                .map_err(|e| format!("Failed to resolve experiment: {e}"))?;
            let run = client
                .start_run(&experiment_id, Some(&format!("register-{}", args.base)))
                .map_err(|e| format!("Failed to start run: {e}"))?;
            log(
                log_level,
                LogLevel::Normal,
                &format!(
                    "Registering {name} from {} under new run {}",
                    args.model_dir.display(),
                    run.run_id
                ),
            );

            let registered = client.log_and_register_model(&run.run_id, &args.base, &artifact);
            let status = if registered.is_ok() { RunStatus::Finished } else { RunStatus::Failed };
            let ended = client.end_run(&run.run_id, status);
            let registered = registered.map_err(|e| format!("Registration failed: {e}"))?;
            ended.map_err(|e| format!("Failed to end run {}: {e}", run.run_id))?;
            registered
        }
    };

    log(log_level, LogLevel::Verbose, &format!("Logged artifact at {}", info.artifact_uri));

    match format {
        OutputFormat::Json => to_json(&json!({
            "model_version": version,
            "model_info": info,
        })),
        OutputFormat::Text => Ok(format!("{}\n  Model:   {}", version_detail(&version), info.model_uri)),
    }
}

pub(super) fn run_transition<C: RegistryClient>(
    client: &EnvRegistryClient<C>,
    args: &VersionArgs,
    format: OutputFormat,
    log_level: LogLevel,
) -> Result<String, String> {
    log(
        log_level,
        LogLevel::Verbose,
        &format!("Moving version {} of {} to {}", args.version, args.base, client.stage()),
    );

    let version = client
        .transition_model_version_stage(&args.base, args.version)
        .map_err(|e| format!("Transition failed: {e}"))?;

    match format {
        OutputFormat::Json => to_json(&version),
        OutputFormat::Text => Ok(version_detail(&version)),
    }
}

pub(super) fn run_download_uri<C: RegistryClient>(
    client: &EnvRegistryClient<C>,
    args: &VersionArgs,
    format: OutputFormat,
) -> Result<String, String> {
    let uri = client
        .get_model_version_download_uri(&args.base, args.version)
        .map_err(|e| e.to_string())?;

    match format {
        OutputFormat::Json => to_json(&json!({
            "version": args.version,
            "artifact_uri": uri,
        })),
        OutputFormat::Text => Ok(uri),
    }
}
