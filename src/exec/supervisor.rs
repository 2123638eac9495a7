// src/exec/supervisor.rs

//! Async shell around [`ProcessLifecycle`].
//!
//! Spawns the child, feeds process events into the lifecycle core and carries
//! out the commands it returns (signal routes, settlement). All decisions
//! about ordering and idempotence live in the core.

use std::process::Stdio;
use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{Result, RunError};
use crate::exec::env::EnvironmentSet;
use crate::exec::exit::Termination;
use crate::exec::lifecycle::{
    LifecycleCommand, LifecycleEvent, LifecycleStep, ProcessLifecycle, Settlement, SpawnFailure,
};
use crate::exec::signals::{ChildSignaller, PidSignaller, SignalRoute};
use crate::exec::stream::{PumpStats, pump};
use crate::monitor::StreamTransform;

/// Destination for relayed child output.
pub type OutputSink = Box<dyn AsyncWrite + Send + Unpin>;

/// One stdout and one stderr transform.
pub type StreamTransforms = (Box<dyn StreamTransform>, Box<dyn StreamTransform>);

pub struct Supervisor {
    command: String,
    args: Vec<String>,
    env: EnvironmentSet,
    transforms: Option<StreamTransforms>,
    stdout: OutputSink,
    stderr: OutputSink,
}

impl Supervisor {
    pub fn new(command: impl Into<String>, args: Vec<String>, env: EnvironmentSet) -> Self {
        Self {
            command: command.into(),
            args,
            env,
            transforms: None,
            stdout: Box::new(tokio::io::stdout()),
            stderr: Box::new(tokio::io::stderr()),
        }
    }

    /// Pipe the child's output through these transforms. Without them the
    /// child writes straight to the inherited stdout/stderr.
    pub fn with_pipes(mut self, transforms: Option<StreamTransforms>) -> Self {
        self.transforms = transforms;
        self
    }

    /// Where piped output goes. Defaults to the supervisor's own stdout and
    /// stderr.
    pub fn with_output(mut self, stdout: OutputSink, stderr: OutputSink) -> Self {
        self.stdout = stdout;
        self.stderr = stderr;
        self
    }

    /// Run the child to completion and return its normalized exit code.
    pub async fn run(self) -> Result<i32> {
        let Supervisor {
            command,
            args,
            env,
            transforms,
            stdout,
            stderr,
        } = self;

        let mut shell = Shell::default();
        let mut lifecycle = ProcessLifecycle::new();

        let mut cmd = Command::new(&command);
        cmd.args(&args).stdin(Stdio::inherit());
        env.apply_to(&mut cmd);
        if transforms.is_some() {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        info!(
            cmd = %command,
            args = ?args,
            piped = transforms.is_some(),
            "starting child process"
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let not_found = e.kind() == std::io::ErrorKind::NotFound;
                let failure = if not_found {
                    SpawnFailure::NotFound
                } else {
                    SpawnFailure::Other(e.to_string())
                };
                shell.apply(lifecycle.step(LifecycleEvent::SpawnFailed(failure)));
                return Err(if not_found {
                    RunError::SpawnNotFound(command)
                } else {
                    RunError::Spawn { command, source: e }
                });
            }
        };

        let pid = child.id();
        debug!(?pid, "child spawned");
        shell.apply(lifecycle.step(LifecycleEvent::Spawned { pid }));

        let mut pumps: Vec<JoinHandle<PumpStats>> = Vec::with_capacity(2);
        if let Some((out_transform, err_transform)) = transforms {
            if let Some(reader) = child.stdout.take() {
                pumps.push(tokio::spawn(pump(reader, stdout, out_transform)));
            }
            if let Some(reader) = child.stderr.take() {
                pumps.push(tokio::spawn(pump(reader, stderr, err_transform)));
            }
        }

        let event = match child.wait().await {
            Ok(status) => LifecycleEvent::Closed(Termination::from_status(status)),
            Err(e) => LifecycleEvent::WaitFailed(e.to_string()),
        };
        // Routes are torn down here, before draining, so nothing is relayed
        // to the pid once it has been reaped.
        let settlement = shell.apply(lifecycle.step(event));

        for handle in pumps {
            if let Err(e) = handle.await {
                warn!(error = %e, "output pump task failed");
            }
        }

        match settlement {
            Some(Settlement::Exited { code }) => {
                info!(cmd = %command, exit_code = code, "child process exited");
                Ok(code)
            }
            Some(Settlement::Failed(SpawnFailure::NotFound)) => Err(RunError::SpawnNotFound(command)),
            Some(Settlement::Failed(SpawnFailure::Other(reason))) => Err(RunError::Spawn {
                command,
                source: std::io::Error::other(reason),
            }),
            None => Err(RunError::Other(anyhow::anyhow!(
                "child process '{command}' finished without a result"
            ))),
        }
    }
}

/// Side effects requested by the lifecycle core.
#[derive(Default)]
struct Shell {
    route: Option<SignalRoute>,
}

impl Shell {
    fn apply(&mut self, step: LifecycleStep) -> Option<Settlement> {
        let mut settlement = None;
        for command in step.commands {
            match command {
                LifecycleCommand::InstallSignalRoutes { pid } => self.install(pid),
                LifecycleCommand::TeardownSignalRoutes => {
                    if let Some(route) = self.route.take() {
                        route.teardown();
                    }
                }
                LifecycleCommand::Settle(s) => settlement = Some(s),
            }
        }
        settlement
    }

    fn install(&mut self, pid: u32) {
        let signaller = match PidSignaller::new(pid) {
            Ok(s) => Arc::new(s) as Arc<dyn ChildSignaller>,
            Err(e) => {
                warn!(pid, error = %e, "not relaying signals");
                return;
            }
        };
        match SignalRoute::install(signaller) {
            Ok(route) => self.route = Some(route),
            Err(e) => warn!(pid, error = %e, "could not install signal handlers"),
        }
    }
}
