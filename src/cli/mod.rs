//! CLI module for entorno
//!
//! Command handlers and output utilities for the `entorno` binary.

mod commands;
mod logging;

pub use commands::{execute, load_config, run_command};
pub use logging::{init_tracing, LogLevel};

// Re-export Cli from config for convenience
pub use crate::config::Cli;
