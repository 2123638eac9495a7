// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod monitor;
pub mod report;
pub mod request;
pub mod secrets;
pub mod types;

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::cli::{Cli, Command};
use crate::config::{Config, load_for_run};
use crate::errors::Result;
use crate::exec::{EnvironmentSet, OutputSink, Supervisor};
use crate::monitor::{
    MemoryMonitorFactory, MonitorFactory, MonitoringSession, StreamName, create_session,
};
use crate::report::{Reporter, RunResult, close_session};
use crate::request::RunRequest;
use crate::secrets::{EnvironmentResolver, SecretMap};

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - request validation and config loading
/// - secret resolution and monitoring setup
/// - the supervised child
/// - the run summary
pub async fn run(cli: Cli) -> i32 {
    match cli.command {
        Command::Run(args) => {
            let request = match RunRequest::try_from(args) {
                Ok(request) => request,
                Err(e) => return fail(e),
            };
            run_request(&request).await
        }
    }
}

/// Run an already validated request with the production collaborators.
pub async fn run_request(request: &RunRequest) -> i32 {
    let started = Instant::now();
    let config = match load_for_run(request.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return fail(e),
    };

    let runner = Runner::from_config(&config).started_at(started);
    match runner.execute(request, &config).await {
        Ok(result) => Reporter::new(request.quiet).report(&result, &mut std::io::stderr()),
        Err(e) => fail(e),
    }
}

fn fail(err: errors::RunError) -> i32 {
    eprintln!("runwarden: {err}");
    err.exit_code()
}

/// One supervised run, with its collaborators.
pub struct Runner {
    resolver: EnvironmentResolver,
    monitors: Arc<dyn MonitorFactory>,
    output: Option<(OutputSink, OutputSink)>,
    started: Option<Instant>,
}

impl Runner {
    pub fn new(resolver: EnvironmentResolver, monitors: Arc<dyn MonitorFactory>) -> Self {
        Self {
            resolver,
            monitors,
            output: None,
            started: None,
        }
    }

    /// Production wiring: file vault, local/cloud keys, in-memory telemetry.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            EnvironmentResolver::from_config(config),
            Arc::new(MemoryMonitorFactory::default()),
        )
    }

    /// Send monitored child output here instead of the real stdout/stderr.
    pub fn with_output(mut self, stdout: OutputSink, stderr: OutputSink) -> Self {
        self.output = Some((stdout, stderr));
        self
    }

    /// Measure the run's duration from `started` instead of from `execute`.
    pub fn started_at(mut self, started: Instant) -> Self {
        self.started = Some(started);
        self
    }

    pub async fn execute(self, request: &RunRequest, config: &Config) -> Result<RunResult> {
        let started = self.started.unwrap_or_else(Instant::now);
        info!(
            cmd = %request.command,
            scope = %request.scope,
            secrets = request.secrets_enabled,
            monitor = request.monitor_enabled,
            "run requested"
        );

        let resolve = async {
            if request.secrets_enabled {
                self.resolver
                    .resolve(request.scope, request.service.as_deref())
                    .await
            } else {
                debug!("secret resolution skipped");
                SecretMap::new()
            }
        };
        let session = async {
            if request.monitor_enabled {
                create_session(self.monitors.as_ref(), config).await
            } else {
                None
            }
        };
        let (secrets, session) = tokio::join!(resolve, session);

        let monitoring =
            session.map(|s| MonitoringSession::initialize(s, request, config, &secrets));

        let env = EnvironmentSet::inherit_current()
            .with_secrets(&secrets, request.secrets_enabled)
            .with_session_id(monitoring.as_ref().map(MonitoringSession::session_id));
        let secrets_injected = env.secrets_injected();

        let transforms = monitoring.as_ref().map(|m| {
            (
                m.stream_transform(StreamName::Stdout),
                m.stream_transform(StreamName::Stderr),
            )
        });

        let mut supervisor =
            Supervisor::new(&request.command, request.args.clone(), env).with_pipes(transforms);
        if let Some((stdout, stderr)) = self.output {
            supervisor = supervisor.with_output(stdout, stderr);
        }

        let outcome = supervisor.run().await;
        let duration = started.elapsed();
        let exposures = close_session(monitoring.as_ref().map(MonitoringSession::session)).await;
        let exit_code = outcome?;

        Ok(RunResult::new(
            exit_code,
            secrets_injected,
            exposures,
            duration,
        ))
    }
}
