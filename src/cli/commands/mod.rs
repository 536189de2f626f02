//! CLI command implementations

mod experiment;
mod models;
mod names;
mod output;

#[cfg(test)]
mod tests;

use crate::cli::LogLevel;
use crate::client::EnvRegistryClient;
use crate::config::{apply_overrides, Cli, ClientConfig, Command, OutputFormat};
use crate::registry::RegistryClient;

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<(), String> {
    let log_level = LogLevel::from_flags(cli.quiet, cli.verbose);
    let config = load_config(&cli)?;

    match &cli.command {
        // Pure derivations need no tracking server
        Command::Name(args) => {
            let env = names::resolve(&config)?;
            emit(names::run_name(&env, args, cli.format)?)
        }
        Command::Stage => {
            let env = names::resolve(&config)?;
            emit(names::run_stage(&env, cli.format)?)
        }
        command => {
            let client = EnvRegistryClient::from_config(&config).map_err(|e| e.to_string())?;
            execute(command, &client, cli.format, log_level)
        }
    }
}

/// Configuration file, then environment variables, then CLI flags
pub fn load_config(cli: &Cli) -> Result<ClientConfig, String> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path).map_err(|e| e.to_string())?,
        None => ClientConfig::default(),
    };
    config.apply_env();
    apply_overrides(&mut config, cli);
    Ok(config)
}

/// Run `command` against an already constructed client and print the result
pub fn execute<C: RegistryClient>(
    command: &Command,
    client: &EnvRegistryClient<C>,
    format: OutputFormat,
    log_level: LogLevel,
) -> Result<(), String> {
    let rendered = match command {
        Command::Name(args) => names::run_name(client.environment(), args, format)?,
        Command::Stage => names::run_stage(client.environment(), format)?,
        Command::Experiment(args) => experiment::run_experiment(client, args, format, log_level)?,
        Command::Versions(args) => models::run_versions(client, args, format)?,
        Command::Latest(args) => models::run_latest(client, args, format)?,
        Command::Register(args) => models::run_register(client, args, format, log_level)?,
        Command::Transition(args) => models::run_transition(client, args, format, log_level)?,
        Command::DownloadUri(args) => models::run_download_uri(client, args, format)?,
    };
    emit(rendered)
}

fn emit(rendered: String) -> Result<(), String> {
    println!("{rendered}");
    Ok(())
}
