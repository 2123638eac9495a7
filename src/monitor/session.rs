// src/monitor/session.rs

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::MonitorSection;
use crate::monitor::{ExposureEvent, MonitorFactory, TelemetrySession, TelemetryStats};
use crate::types::{BoxFuture, Scope};

/// In-memory telemetry session.
///
/// Every event bumps a per-kind counter. Events themselves are buffered only
/// when an events log is configured (or [`keep_events`](Self::keep_events)
/// asks for it); `shutdown` appends the buffer to the log as JSON lines.
#[derive(Debug)]
pub struct MemorySession {
    id: String,
    scope: Mutex<Option<Scope>>,
    counts: Mutex<TelemetryStats>,
    events: Mutex<Vec<ExposureEvent>>,
    buffer_events: bool,
    events_log: Option<PathBuf>,
}

#[derive(Serialize)]
struct LoggedEvent<'a> {
    session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<Scope>,
    #[serde(flatten)]
    event: &'a ExposureEvent,
}

impl MemorySession {
    pub fn new(id: impl Into<String>, events_log: Option<PathBuf>) -> Self {
        Self {
            id: id.into(),
            scope: Mutex::new(None),
            counts: Mutex::new(TelemetryStats::new()),
            events: Mutex::new(Vec::new()),
            buffer_events: events_log.is_some(),
            events_log,
        }
    }

    /// Buffer events even without an events log.
    pub fn keep_events(mut self) -> Self {
        self.buffer_events = true;
        self
    }

    pub fn events(&self) -> Vec<ExposureEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn scope(&self) -> Option<Scope> {
        *self.scope.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn render_log(&self) -> anyhow::Result<Vec<u8>> {
        let scope = self.scope();
        let events = self.events();
        let mut out = Vec::new();
        for event in events.iter() {
            let line = LoggedEvent {
                session_id: &self.id,
                scope,
                event,
            };
            serde_json::to_writer(&mut out, &line).context("serializing exposure event")?;
            out.push(b'\n');
        }
        Ok(out)
    }

    async fn write_log(&self) -> anyhow::Result<()> {
        let Some(path) = self.events_log.as_ref() else {
            return Ok(());
        };

        let payload = self.render_log()?;
        if payload.is_empty() {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating dir {:?}", parent))?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("opening events log {:?}", path))?;
        file.write_all(&payload)
            .await
            .with_context(|| format!("writing events log {:?}", path))?;
        file.flush().await?;

        debug!(session = %self.id, path = %path.display(), "exposure events written");
        Ok(())
    }
}

impl TelemetrySession for MemorySession {
    fn session_id(&self) -> &str {
        &self.id
    }

    fn set_scope(&self, scope: Scope) {
        *self.scope.lock().unwrap_or_else(|e| e.into_inner()) = Some(scope);
    }

    fn record(&self, event: ExposureEvent) {
        debug!(session = %self.id, kind = %event.kind, stream = %event.stream, "exposure recorded");
        *self
            .counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(event.kind.clone())
            .or_insert(0) += 1;
        if self.buffer_events {
            self.events
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(event);
        }
    }

    fn shutdown(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(self.write_log())
    }

    fn stats(&self) -> TelemetryStats {
        self.counts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Default [`MonitorFactory`]: one [`MemorySession`] per run.
#[derive(Debug, Clone, Default)]
pub struct MemoryMonitorFactory;

impl MonitorFactory for MemoryMonitorFactory {
    fn create_session<'a>(
        &'a self,
        config: &'a MonitorSection,
        session_id: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Arc<dyn TelemetrySession>>> {
        let session = MemorySession::new(session_id, config.events_log.clone());
        Box::pin(async move { Ok(Arc::new(session) as Arc<dyn TelemetrySession>) })
    }
}
