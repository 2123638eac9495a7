// src/logging.rs

//! Logging setup for `runwarden` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--quiet` pins the level to `error`
//! 2. `--verbose` selects `debug`
//! 3. `RUNWARDEN_LOG` environment variable (e.g. "warn", "debug")
//! 4. default to `error`
//!
//! Secret provider and monitor degradation is logged at `warn`, so it only
//! shows up with `--verbose` or an explicit `RUNWARDEN_LOG`.
//!
//! Logs go to STDERR; STDOUT belongs to the supervised command.

use anyhow::Result;
use tracing_subscriber::fmt;

/// How chatty the supervisor itself should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }
}

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(verbosity: Verbosity) -> Result<()> {
    let env_level = std::env::var("RUNWARDEN_LOG")
        .ok()
        .and_then(|s| parse_level_str(&s));
    let level = effective_level(verbosity, env_level);

    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    Ok(())
}

fn effective_level(verbosity: Verbosity, env_level: Option<tracing::Level>) -> tracing::Level {
    match verbosity {
        Verbosity::Quiet => tracing::Level::ERROR,
        Verbosity::Verbose => tracing::Level::DEBUG,
        Verbosity::Normal => env_level.unwrap_or(tracing::Level::ERROR),
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_over_environment() {
        assert_eq!(
            effective_level(Verbosity::Quiet, Some(tracing::Level::TRACE)),
            tracing::Level::ERROR
        );
    }

    #[test]
    fn environment_only_applies_without_flags() {
        assert_eq!(
            effective_level(Verbosity::Normal, Some(tracing::Level::WARN)),
            tracing::Level::WARN
        );
        assert_eq!(
            effective_level(Verbosity::Verbose, Some(tracing::Level::WARN)),
            tracing::Level::DEBUG
        );
        assert_eq!(effective_level(Verbosity::Normal, None), tracing::Level::ERROR);
    }

    #[test]
    fn level_strings_are_lenient() {
        assert_eq!(parse_level_str(" Warning "), Some(tracing::Level::WARN));
        assert_eq!(parse_level_str("loud"), None);
    }

    #[test]
    fn quiet_flag_beats_verbose_flag() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Verbose);
    }
}
