use std::collections::BTreeMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use runwarden::config::MonitorSection;
use runwarden::errors::ProviderError;
use runwarden::exec::{ChildSignaller, RelaySignal};
use runwarden::monitor::{
    ExposureEvent, MemorySession, MonitorFactory, TelemetrySession, TelemetryStats,
};
use runwarden::secrets::{KeyLookup, KeySource, SecretMap, SecretProvider, VaultKey};
use runwarden::types::{BoxFuture, Scope};
use tokio::io::AsyncWrite;

/// A vault held in memory.
///
/// - `get_variables` returns the map registered for the scope (empty if none)
/// - records every `(service, scope)` it was asked for
pub struct FakeSecretProvider {
    initialized: bool,
    vars: BTreeMap<Scope, SecretMap>,
    calls: Mutex<Vec<(Option<String>, Scope)>>,
}

impl FakeSecretProvider {
    pub fn new() -> Self {
        Self {
            initialized: true,
            vars: BTreeMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn uninitialized() -> Self {
        Self {
            initialized: false,
            ..Self::new()
        }
    }

    pub fn with_var(mut self, scope: Scope, key: &str, value: &str) -> Self {
        self.vars
            .entry(scope)
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(Option<String>, Scope)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for FakeSecretProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretProvider for FakeSecretProvider {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn get_variables<'a>(
        &'a self,
        service: Option<&'a str>,
        scope: Scope,
        _key: &'a VaultKey,
    ) -> BoxFuture<'a, Result<SecretMap, ProviderError>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((service.map(str::to_string), scope));
            if !self.initialized {
                return Err(ProviderError::NotInitialized);
            }
            Ok(self.vars.get(&scope).cloned().unwrap_or_default())
        })
    }
}

/// Key source that always answers the same way and counts lookups.
pub struct StaticKeySource {
    outcome: KeyLookup,
    lookups: AtomicUsize,
}

impl StaticKeySource {
    pub fn found(key: &str) -> Self {
        Self::answering(KeyLookup::Found(VaultKey::new(key)))
    }

    pub fn not_found() -> Self {
        Self::answering(KeyLookup::NotFound)
    }

    pub fn answering(outcome: KeyLookup) -> Self {
        Self {
            outcome,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl KeySource for StaticKeySource {
    fn lookup(&self, _scope: Scope) -> BoxFuture<'_, KeyLookup> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}

/// Factory whose sessions can never be created.
#[derive(Default)]
pub struct FailingMonitorFactory;

impl MonitorFactory for FailingMonitorFactory {
    fn create_session<'a>(
        &'a self,
        _config: &'a MonitorSection,
        _session_id: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Arc<dyn TelemetrySession>>> {
        Box::pin(async { Err(anyhow::anyhow!("telemetry backend offline")) })
    }
}

/// Hands out sessions whose `shutdown` takes `delay` to finish.
pub struct SlowShutdownFactory {
    delay: Duration,
}

impl SlowShutdownFactory {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl MonitorFactory for SlowShutdownFactory {
    fn create_session<'a>(
        &'a self,
        _config: &'a MonitorSection,
        session_id: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Arc<dyn TelemetrySession>>> {
        let session = SlowShutdownSession {
            inner: MemorySession::new(session_id, None),
            delay: self.delay,
        };
        Box::pin(async move { Ok(Arc::new(session) as Arc<dyn TelemetrySession>) })
    }
}

struct SlowShutdownSession {
    inner: MemorySession,
    delay: Duration,
}

impl TelemetrySession for SlowShutdownSession {
    fn session_id(&self) -> &str {
        self.inner.session_id()
    }

    fn set_scope(&self, scope: Scope) {
        self.inner.set_scope(scope);
    }

    fn record(&self, event: ExposureEvent) {
        self.inner.record(event);
    }

    fn shutdown(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.inner.shutdown().await
        })
    }

    fn stats(&self) -> TelemetryStats {
        self.inner.stats()
    }
}

/// Counts forwarded signals instead of sending them.
#[derive(Default)]
pub struct CountingSignaller {
    forwarded: Mutex<Vec<RelaySignal>>,
}

impl CountingSignaller {
    pub fn forwarded(&self) -> Vec<RelaySignal> {
        self.forwarded.lock().unwrap().clone()
    }
}

impl ChildSignaller for CountingSignaller {
    fn forward(&self, signal: RelaySignal) -> anyhow::Result<()> {
        self.forwarded.lock().unwrap().push(signal);
        Ok(())
    }
}

/// An `AsyncWrite` sink whose contents can be read back after the writer has
/// been moved into the code under test.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().unwrap().clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    pub fn sink(&self) -> Box<dyn AsyncWrite + Send + Unpin> {
        Box::new(self.clone())
    }
}

impl AsyncWrite for SharedBuffer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.inner.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
