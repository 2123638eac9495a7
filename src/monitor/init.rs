// src/monitor/init.rs

//! Per-run monitoring setup.
//!
//! Protection settings are resolved field by field, first match wins:
//!
//! | field       | CLI             | `[scopes.<scope>]` | `[monitor]`   | default      |
//! |-------------|-----------------|--------------------|---------------|--------------|
//! | mode        | `--mode`        | `mode`             | `mode`        | `detect`     |
//! | redact text | `--redact-text` | `redact_text`      | `redact_text` | `[REDACTED]` |
//!
//! Overriding only the redact text never changes the mode.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{Config, DEFAULT_REDACT_TEXT};
use crate::monitor::{
    HookManager, MonitorFactory, SecretsMonitor, StreamName, StreamTransform, TelemetrySession,
};
use crate::request::RunRequest;
use crate::secrets::SecretMap;
use crate::types::{ProtectionMode, Scope};

/// Effective protection for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionSettings {
    pub mode: ProtectionMode,
    pub redact_text: String,
}

pub fn resolve_protection(
    cli_mode: Option<ProtectionMode>,
    cli_redact_text: Option<&str>,
    config: &Config,
    scope: Scope,
) -> ProtectionSettings {
    let scoped = config.scope(scope);
    let global = config.monitor();

    let mode = cli_mode
        .or_else(|| scoped.and_then(|s| s.mode))
        .or(global.mode)
        .unwrap_or_default();

    let redact_text = cli_redact_text
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| scoped.and_then(|s| s.redact_text.clone()))
        .or_else(|| global.redact_text.clone())
        .unwrap_or_else(|| DEFAULT_REDACT_TEXT.to_string());

    ProtectionSettings { mode, redact_text }
}

/// Create the telemetry session for a run.
///
/// Returns `None` (after a warning) if the factory fails; the run then
/// continues unmonitored.
pub async fn create_session(
    factory: &dyn MonitorFactory,
    config: &Config,
) -> Option<Arc<dyn TelemetrySession>> {
    let session_id = Uuid::new_v4().to_string();
    match factory.create_session(config.monitor(), &session_id).await {
        Ok(session) => Some(session),
        Err(e) => {
            warn!(error = %e, "monitoring unavailable; continuing unmonitored");
            None
        }
    }
}

/// Everything the supervisor needs from monitoring for one run.
pub struct MonitoringSession {
    session: Arc<dyn TelemetrySession>,
    monitor: Arc<SecretsMonitor>,
    hooks: HookManager,
}

impl MonitoringSession {
    /// Wire up the secrets monitor for `request` on top of `session`.
    ///
    /// Every resolved secret value is tracked as sensitive.
    pub fn initialize(
        session: Arc<dyn TelemetrySession>,
        request: &RunRequest,
        config: &Config,
        secrets: &SecretMap,
    ) -> Self {
        session.set_scope(request.scope);

        let settings = resolve_protection(
            request.mode,
            request.redact_text.as_deref(),
            config,
            request.scope,
        );

        let monitor = Arc::new(SecretsMonitor::with_builtin_patterns());
        for (i, pattern) in config.monitor().patterns.iter().enumerate() {
            let kind = format!("custom_{i}");
            if let Err(e) = monitor.add_pattern(&kind, pattern) {
                warn!(%pattern, error = %e, "invalid monitor pattern; ignoring");
            }
        }
        for (key, value) in secrets.iter() {
            monitor.track_value(key, value);
        }
        monitor.set_mode(settings.mode);
        monitor.set_redact_text(&settings.redact_text);

        let mut hooks = HookManager::new(Arc::clone(&session));
        hooks.create_context(session.session_id(), &request.command, &request.args);
        monitor.register_hooks(&mut hooks);

        info!(
            session = session.session_id(),
            mode = %monitor.mode(),
            patterns = monitor.pattern_count(),
            "monitoring enabled"
        );

        Self {
            session,
            monitor,
            hooks,
        }
    }

    pub fn session(&self) -> &Arc<dyn TelemetrySession> {
        &self.session
    }

    pub fn session_id(&self) -> &str {
        self.session.session_id()
    }

    pub fn mode(&self) -> ProtectionMode {
        self.monitor.mode()
    }

    pub fn redact_text(&self) -> String {
        self.monitor.redact_text()
    }

    pub fn stream_transform(&self, stream: StreamName) -> Box<dyn StreamTransform> {
        self.hooks.create_stream_transform(stream)
    }
}
