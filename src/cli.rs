// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `wavebuild`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "wavebuild",
    version,
    about = "Continuous incremental build daemon: builds the requested targets and rebuilds them as files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Targets to keep built (e.g. `app/server`).
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Path to the daemon settings file (TOML).
    ///
    /// Default: `Wavebuild.toml` in the current working directory; built-in
    /// defaults are used when that file does not exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Build the targets once and exit, no watching.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WAVEBUILD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the dependency closure of the targets, but don't
    /// build anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
