// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Scope and mode are taken as plain strings and validated when the
//! [`RunRequest`](crate::request::RunRequest) is built, so that invalid values
//! are reported as usage errors with exit code 1 instead of clap's default 2.

use clap::{Args, Parser, Subcommand};

/// Command-line arguments for `runwarden`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runwarden",
    version,
    about = "Run a command with injected secrets and monitored output.",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a command under supervision.
    Run(RunArgs),
}

/// Arguments for `runwarden run`.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Secret scope: development, staging or production.
    #[arg(long, value_name = "SCOPE", default_value = "development")]
    pub scope: String,

    /// Service whose secrets are layered over the scope's variables.
    #[arg(long, value_name = "NAME")]
    pub service: Option<String>,

    /// Do not inject any secrets into the child environment.
    #[arg(long)]
    pub no_secrets: bool,

    /// Do not inspect the child's output.
    #[arg(long)]
    pub no_monitor: bool,

    /// Protection mode: detect, redact or block.
    ///
    /// Overrides any mode from the config file.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Text substituted for secrets in redact mode.
    #[arg(long, value_name = "TEXT")]
    pub redact_text: Option<String>,

    /// Show debug logs, including secret provider warnings.
    #[arg(long)]
    pub verbose: bool,

    /// Suppress the run summary and all non-essential output.
    #[arg(long)]
    pub quiet: bool,

    /// Path to the config file (TOML).
    ///
    /// Default: `Runwarden.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// The command to run, followed by its arguments.
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Parse the process arguments without exiting on error.
///
/// `main` decides the exit code: help/version exit 0, everything else 1.
pub fn parse() -> Result<Cli, clap::Error> {
    Cli::try_parse()
}
