// src/exec/signals.rs

//! Relaying termination signals from the supervisor to its child.
//!
//! While a child is running, SIGINT, SIGTERM and SIGHUP received by the
//! supervisor are forwarded to it. Once the child has exited the route is torn
//! down and nothing is forwarded anymore, so a recycled pid can never be hit.
//!
//! Tokio cannot unregister its OS handlers, so the listeners outlive teardown.
//! A signal arriving after teardown, with no other installed route active,
//! gets the default disposition: the handler is reset to `SIG_DFL` and the
//! signal is raised again.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use nix::sys::signal::{SigHandler, Signal, kill, raise};
use nix::unistd::Pid;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A signal the supervisor relays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelaySignal {
    Interrupt,
    Terminate,
    Hangup,
}

impl RelaySignal {
    pub const ALL: [RelaySignal; 3] = [
        RelaySignal::Interrupt,
        RelaySignal::Terminate,
        RelaySignal::Hangup,
    ];

    fn kind(self) -> SignalKind {
        match self {
            RelaySignal::Interrupt => SignalKind::interrupt(),
            RelaySignal::Terminate => SignalKind::terminate(),
            RelaySignal::Hangup => SignalKind::hangup(),
        }
    }

    pub fn as_nix(self) -> Signal {
        match self {
            RelaySignal::Interrupt => Signal::SIGINT,
            RelaySignal::Terminate => Signal::SIGTERM,
            RelaySignal::Hangup => Signal::SIGHUP,
        }
    }
}

/// Delivers a relayed signal to the child.
pub trait ChildSignaller: Send + Sync {
    fn forward(&self, signal: RelaySignal) -> Result<()>;
}

/// Sends signals to a process id with `kill(2)`.
#[derive(Debug, Clone, Copy)]
pub struct PidSignaller {
    pid: Pid,
}

impl PidSignaller {
    pub fn new(pid: u32) -> Result<Self> {
        let raw = i32::try_from(pid).context("pid out of range")?;
        if raw <= 0 {
            anyhow::bail!("refusing to signal pid {raw}");
        }
        Ok(Self {
            pid: Pid::from_raw(raw),
        })
    }
}

impl ChildSignaller for PidSignaller {
    fn forward(&self, signal: RelaySignal) -> Result<()> {
        kill(self.pid, signal.as_nix())
            .with_context(|| format!("sending {:?} to pid {}", signal.as_nix(), self.pid))
    }
}

/// Called for every signal that arrives after its route was torn down.
pub type SignalFallback = Arc<dyn Fn(RelaySignal) + Send + Sync>;

/// Routes created by [`SignalRoute::install`] that are still forwarding.
static ACTIVE_ROUTES: AtomicUsize = AtomicUsize::new(0);

/// Apply the OS default action to `relay`, unless another route owns it now.
fn default_disposition(relay: RelaySignal) {
    if ACTIVE_ROUTES.load(Ordering::SeqCst) > 0 {
        debug!(signal = ?relay, "signal belongs to a newer route");
        return;
    }
    let sig = relay.as_nix();
    debug!(signal = ?sig, "no child to relay to; applying default action");
    // SAFETY: SIG_DFL runs no handler code in this process.
    if let Err(e) = unsafe { nix::sys::signal::signal(sig, SigHandler::SigDfl) } {
        warn!(signal = ?sig, error = %e, "failed to restore default disposition");
    } else if let Err(e) = raise(sig) {
        warn!(signal = ?sig, error = %e, "failed to re-raise signal");
    }
    std::process::exit(128 + sig as i32);
}

/// An installed signal route. Dropping it tears it down.
pub struct SignalRoute {
    active: Arc<AtomicBool>,
    counted: bool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SignalRoute {
    /// Listen for the relayed signals and forward them through `signaller`.
    pub fn install(signaller: Arc<dyn ChildSignaller>) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel(8);
        let mut listeners = Vec::with_capacity(RelaySignal::ALL.len());

        for relay in RelaySignal::ALL {
            let mut stream = signal(relay.kind())?;
            let tx = tx.clone();
            listeners.push(tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    if tx.send(relay).await.is_err() {
                        break;
                    }
                }
            }));
        }

        let mut route =
            Self::from_source_with_fallback(rx, signaller, Arc::new(default_disposition));
        ACTIVE_ROUTES.fetch_add(1, Ordering::SeqCst);
        route.counted = true;
        if let Ok(mut tasks) = route.tasks.lock() {
            tasks.extend(listeners);
        }
        Ok(route)
    }

    /// Forward whatever arrives on `source`; signals after teardown are
    /// dropped. Lets tests inject signals without touching the process.
    pub fn from_source(
        source: mpsc::Receiver<RelaySignal>,
        signaller: Arc<dyn ChildSignaller>,
    ) -> Self {
        Self::from_source_with_fallback(source, signaller, Arc::new(|_: RelaySignal| {}))
    }

    /// Like [`from_source`](Self::from_source), handing post-teardown signals
    /// to `fallback`.
    pub fn from_source_with_fallback(
        mut source: mpsc::Receiver<RelaySignal>,
        signaller: Arc<dyn ChildSignaller>,
        fallback: SignalFallback,
    ) -> Self {
        let active = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&active);

        let forwarder = tokio::spawn(async move {
            while let Some(relay) = source.recv().await {
                if !flag.load(Ordering::SeqCst) {
                    fallback(relay);
                    continue;
                }
                debug!(signal = ?relay, "relaying signal to child");
                if let Err(e) = signaller.forward(relay) {
                    warn!(signal = ?relay, error = %e, "failed to relay signal");
                }
            }
        });

        Self {
            active,
            counted: false,
            tasks: Mutex::new(vec![forwarder]),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop forwarding. Returns `true` only for the call that actually tore
    /// the route down.
    ///
    /// The listener tasks keep running (detached once the route is dropped)
    /// so later signals reach the fallback.
    pub fn teardown(&self) -> bool {
        if !self.active.swap(false, Ordering::SeqCst) {
            return false;
        }
        if self.counted {
            ACTIVE_ROUTES.fetch_sub(1, Ordering::SeqCst);
        }
        let detached = match self.tasks.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        debug!(tasks = detached.len(), "signal routes torn down");
        true
    }
}

impl Drop for SignalRoute {
    fn drop(&mut self) {
        self.teardown();
    }
}
