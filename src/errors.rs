// src/errors.rs

//! Crate-wide error types.
//!
//! `RunError` is what the top-level run reports to `main`; every variant maps
//! to the process exit code via [`RunError::exit_code`]. Provider and monitor
//! failures have their own types because they never abort a run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    /// Invalid CLI input. Raised before anything is spawned.
    #[error("{0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The target executable does not exist on `PATH` (or at the given path).
    #[error("command not found: {0}")]
    SpawnNotFound(String),

    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RunError {
    /// Exit code the supervisor reports for this failure.
    ///
    /// Every failure that prevents the child from producing its own exit code
    /// is reported as `1`.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Failure to resolve secrets from the vault.
///
/// These are downgraded to warnings by the environment resolver.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("secret vault is not initialized")]
    NotInitialized,

    #[error("no decryption key available for scope '{0}'")]
    KeyUnavailable(String),

    #[error("decryption key does not match the vault for scope '{0}'")]
    KeyMismatch(String),

    #[error("unknown service '{service}' in scope '{scope}'")]
    UnknownService { service: String, scope: String },

    #[error("vault IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vault parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RunError>;
