//! Entorno CLI
//!
//! Environment-scoped access to an MLflow model registry.
//!
//! # Usage
//!
//! ```bash
//! # Namespaced model name and stage
//! entorno --env prod name deepar
//! entorno --env prod stage
//!
//! # Experiment folder
//! MLFLOW_TRACKING_URI=http://localhost:5000 entorno --env acc experiment experiment1
//!
//! # Register a model directory and look it up again
//! entorno --env test register deepar --run-id abc123 --model-dir ./model --flavor pyfunc
//! entorno --env test latest deepar --format json
//! ```

use clap::Parser;
use entorno::cli::{init_tracing, run_command, Cli, LogLevel};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(LogLevel::from_flags(cli.quiet, cli.verbose));

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
