//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! entorno --env prod name deepar
//! entorno --env acc stage
//! entorno --env acc experiment experiment1
//! entorno --env test latest deepar --flavor pyfunc --format json
//! entorno --env test register deepar --run-id abc --model-dir ./model --flavor pyfunc
//! ```

mod core;
mod types;


pub use core::{
    apply_overrides, parse_args, Cli, Command, ExperimentArgs, LatestArgs, ModelArgs, NameArgs,
    RegisterArgs, VersionArgs,
};
pub use types::OutputFormat;
