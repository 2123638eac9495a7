// src/report.rs

//! End-of-run summary.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::monitor::{TelemetrySession, exposure_count};

/// Outcome of one run, produced once after the child has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    pub exit_code: i32,
    pub secrets_injected: usize,
    pub secret_exposures: u64,
    pub duration_ms: u64,
}

impl RunResult {
    pub fn new(
        exit_code: i32,
        secrets_injected: usize,
        secret_exposures: u64,
        elapsed: Duration,
    ) -> Self {
        Self {
            exit_code,
            secrets_injected,
            secret_exposures,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// `850ms`, `12.3s`, `4m 5s`.
pub fn format_duration(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else {
        let secs = ms / 1_000;
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

fn plural(n: u64, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Lines printed after a run.
pub fn summary_lines(result: &RunResult) -> Vec<String> {
    let mut lines = vec![format!(
        "[runwarden] exit code {} after {} ({} injected)",
        result.exit_code,
        format_duration(result.duration_ms),
        plural(result.secrets_injected as u64, "secret"),
    )];
    if result.secret_exposures > 0 {
        lines.push(format!(
            "[runwarden] warning: {} detected in output",
            plural(result.secret_exposures, "secret exposure"),
        ));
    }
    lines
}

/// Flush `session` and return the number of exposures it recorded.
///
/// A failed shutdown is only a warning; counts recorded so far are still
/// returned.
pub async fn close_session(session: Option<&Arc<dyn TelemetrySession>>) -> u64 {
    let Some(session) = session else {
        return 0;
    };
    if let Err(e) = session.shutdown().await {
        warn!(session = session.session_id(), error = %e, "telemetry shutdown failed");
    }
    let stats = session.stats();
    debug!(session = session.session_id(), ?stats, "telemetry stats");
    exposure_count(&stats)
}

pub struct Reporter {
    quiet: bool,
}

impl Reporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Print the summary to `out` and return the exit code untouched.
    pub fn report<W: Write>(&self, result: &RunResult, out: &mut W) -> i32 {
        if !self.quiet {
            for line in summary_lines(result) {
                if let Err(e) = writeln!(out, "{line}") {
                    warn!(error = %e, "could not print run summary");
                    break;
                }
            }
        }
        result.exit_code
    }
}
