//! Name and stage derivation commands. These never contact the registry.

use serde_json::json;

use super::output::to_json;
use crate::config::{ClientConfig, NameArgs, OutputFormat};
use crate::environment::Environment;

/// Environment selected by the merged configuration
pub(super) fn resolve(config: &ClientConfig) -> Result<Environment, String> {
    let name = config.environment_name().map_err(|e| e.to_string())?;
    config.environments.resolve(name).map_err(|e| e.to_string())
}

pub(super) fn run_name(env: &Environment, args: &NameArgs, format: OutputFormat) -> Result<String, String> {
    let model_name = env.model_name(&args.base).map_err(|e| e.to_string())?;
    match format {
        OutputFormat::Json => to_json(&json!({
            "environment": env.name(),
            "base": args.base,
            "model_name": model_name,
        })),
        OutputFormat::Text => Ok(model_name),
    }
}

pub(super) fn run_stage(env: &Environment, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => to_json(&json!({
            "environment": env.name(),
            "stage": env.stage(),
        })),
        OutputFormat::Text => Ok(env.stage().to_string()),
    }
}
