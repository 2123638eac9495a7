// src/monitor/mod.rs

//! Output monitoring.
//!
//! The supervisor only sees [`StreamTransform`]: bytes in, bytes out. What a
//! transform actually does (detect, redact, block) is decided by the hooks
//! registered on the [`HookManager`], which in turn report what they found to
//! the run's [`TelemetrySession`].
//!
//! - [`session`]: telemetry session trait objects and the in-memory default.
//! - [`hooks`]: hook manager, hook context and the line-buffered transform.
//! - [`secrets_monitor`]: the hook that looks for secrets.
//! - [`init`]: builds all of the above for one run.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::config::MonitorSection;
use crate::types::{BoxFuture, Scope};

pub mod hooks;
pub mod init;
pub mod secrets_monitor;
pub mod session;

pub use hooks::{HookContext, HookManager, HookVerdict, LineTransform, StreamHook};
pub use init::{MonitoringSession, ProtectionSettings, create_session, resolve_protection};
pub use secrets_monitor::SecretsMonitor;
pub use session::{MemoryMonitorFactory, MemorySession};

/// Which child stream a transform is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamName {
    Stdout,
    Stderr,
}

impl StreamName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamName::Stdout => "stdout",
            StreamName::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sensitive value showed up in the child's output.
///
/// Never carries the matched text itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExposureEvent {
    /// Detector that matched, e.g. `tracked_value` or `aws_access_key_id`.
    pub kind: String,
    pub stream: StreamName,
    /// Variable name, when the match was a tracked secret value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub at_ms: u64,
}

/// Exposure counts keyed by event kind.
pub type TelemetryStats = BTreeMap<String, u64>;

/// Telemetry for one run.
pub trait TelemetrySession: Send + Sync {
    fn session_id(&self) -> &str;

    fn set_scope(&self, scope: Scope);

    fn record(&self, event: ExposureEvent);

    /// Flush buffered records. Must be awaited before reading [`stats`](Self::stats).
    fn shutdown(&self) -> BoxFuture<'_, anyhow::Result<()>>;

    fn stats(&self) -> TelemetryStats;
}

/// Creates telemetry sessions.
pub trait MonitorFactory: Send + Sync {
    fn create_session<'a>(
        &'a self,
        config: &'a MonitorSection,
        session_id: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Arc<dyn TelemetrySession>>>;
}

/// A per-stream byte transformer.
///
/// Implementations may hold back a partial line between calls;
/// [`flush`](Self::flush) releases whatever is pending.
pub trait StreamTransform: Send {
    fn transform(&mut self, chunk: &[u8]) -> Vec<u8>;

    fn flush(&mut self) -> Vec<u8>;

    fn has_pending(&self) -> bool;
}

/// Total exposures across all kinds.
pub fn exposure_count(stats: &TelemetryStats) -> u64 {
    stats.values().sum()
}
