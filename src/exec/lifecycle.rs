// src/exec/lifecycle.rs

//! Pure child-process lifecycle state machine.
//!
//! `ProcessLifecycle` consumes [`LifecycleEvent`]s and returns the commands
//! the async shell ([`Supervisor`](crate::exec::Supervisor)) has to carry
//! out. It owns the settlement flag: whatever happens, exactly one
//! [`LifecycleCommand::Settle`] is ever produced, and signal routes are torn
//! down at most once.
//!
//! ```text
//! Spawning ──Spawned──▶ Running ──Closed──▶ Exited
//!    │                     │
//!    └────SpawnFailed──────┴──WaitFailed──▶ Failed
//! ```
//!
//! No Tokio, no processes, no IO.

use tracing::debug;

use crate::exec::exit::Termination;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessPhase {
    Spawning,
    Running { pid: Option<u32> },
    Exited { code: i32 },
    Failed,
}

impl ProcessPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessPhase::Exited { .. } | ProcessPhase::Failed)
    }
}

/// Why a child could not be started (or waited on).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnFailure {
    NotFound,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Spawned { pid: Option<u32> },
    SpawnFailed(SpawnFailure),
    Closed(Termination),
    WaitFailed(String),
}

/// The single terminal result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Exited { code: i32 },
    Failed(SpawnFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleCommand {
    InstallSignalRoutes { pid: u32 },
    TeardownSignalRoutes,
    Settle(Settlement),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LifecycleStep {
    pub commands: Vec<LifecycleCommand>,
}

#[derive(Debug)]
pub struct ProcessLifecycle {
    phase: ProcessPhase,
    settled: bool,
    routes_installed: bool,
}

impl Default for ProcessLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLifecycle {
    pub fn new() -> Self {
        Self {
            phase: ProcessPhase::Spawning,
            settled: false,
            routes_installed: false,
        }
    }

    pub fn phase(&self) -> &ProcessPhase {
        &self.phase
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn step(&mut self, event: LifecycleEvent) -> LifecycleStep {
        if self.settled {
            debug!(?event, phase = ?self.phase, "lifecycle already settled; ignoring event");
            return LifecycleStep::default();
        }

        match (self.phase.clone(), event) {
            (ProcessPhase::Spawning, LifecycleEvent::Spawned { pid }) => {
                self.phase = ProcessPhase::Running { pid };
                let mut commands = Vec::new();
                if let Some(pid) = pid {
                    self.routes_installed = true;
                    commands.push(LifecycleCommand::InstallSignalRoutes { pid });
                }
                LifecycleStep { commands }
            }
            (ProcessPhase::Spawning | ProcessPhase::Running { .. }, LifecycleEvent::SpawnFailed(failure)) => {
                self.fail(failure)
            }
            (ProcessPhase::Running { .. }, LifecycleEvent::WaitFailed(reason)) => {
                self.fail(SpawnFailure::Other(reason))
            }
            (ProcessPhase::Running { .. }, LifecycleEvent::Closed(termination)) => {
                let code = termination.exit_code();
                self.phase = ProcessPhase::Exited { code };
                self.settle(Settlement::Exited { code })
            }
            (phase, event) => {
                debug!(?event, ?phase, "event not valid in current phase; ignoring");
                LifecycleStep::default()
            }
        }
    }

    fn fail(&mut self, failure: SpawnFailure) -> LifecycleStep {
        self.phase = ProcessPhase::Failed;
        self.settle(Settlement::Failed(failure))
    }

    fn settle(&mut self, settlement: Settlement) -> LifecycleStep {
        self.settled = true;
        let mut commands = Vec::with_capacity(2);
        if std::mem::take(&mut self.routes_installed) {
            commands.push(LifecycleCommand::TeardownSignalRoutes);
        }
        commands.push(LifecycleCommand::Settle(settlement));
        LifecycleStep { commands }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(pid: u32) -> ProcessLifecycle {
        let mut lc = ProcessLifecycle::new();
        let step = lc.step(LifecycleEvent::Spawned { pid: Some(pid) });
        assert_eq!(step.commands, vec![LifecycleCommand::InstallSignalRoutes { pid }]);
        lc
    }

    #[test]
    fn close_tears_down_then_settles() {
        let mut lc = running(42);
        let step = lc.step(LifecycleEvent::Closed(Termination::Code(Some(7))));
        assert_eq!(
            step.commands,
            vec![
                LifecycleCommand::TeardownSignalRoutes,
                LifecycleCommand::Settle(Settlement::Exited { code: 7 }),
            ]
        );
        assert_eq!(lc.phase(), &ProcessPhase::Exited { code: 7 });
        assert!(lc.is_settled());
    }

    #[test]
    fn spawn_failure_settles_without_routes() {
        let mut lc = ProcessLifecycle::new();
        let step = lc.step(LifecycleEvent::SpawnFailed(SpawnFailure::NotFound));
        assert_eq!(
            step.commands,
            vec![LifecycleCommand::Settle(Settlement::Failed(SpawnFailure::NotFound))]
        );
        assert_eq!(lc.phase(), &ProcessPhase::Failed);
    }

    #[test]
    fn close_after_failure_is_ignored() {
        let mut lc = running(1);
        let failed = lc.step(LifecycleEvent::SpawnFailed(SpawnFailure::Other("boom".into())));
        assert_eq!(failed.commands.len(), 2);

        let late = lc.step(LifecycleEvent::Closed(Termination::Code(Some(0))));
        assert!(late.commands.is_empty());
        assert_eq!(lc.phase(), &ProcessPhase::Failed);
    }

    #[test]
    fn second_close_is_ignored() {
        let mut lc = running(1);
        lc.step(LifecycleEvent::Closed(Termination::Signal(nix::libc::SIGINT)));
        let again = lc.step(LifecycleEvent::Closed(Termination::Code(Some(3))));
        assert!(again.commands.is_empty());
        assert_eq!(lc.phase(), &ProcessPhase::Exited { code: 130 });
    }

    #[test]
    fn close_before_spawn_is_ignored() {
        let mut lc = ProcessLifecycle::new();
        let step = lc.step(LifecycleEvent::Closed(Termination::Code(Some(0))));
        assert!(step.commands.is_empty());
        assert!(!lc.is_settled());
        assert!(!lc.phase().is_terminal());
    }

    #[test]
    fn wait_failure_is_a_generic_failure() {
        let mut lc = running(9);
        let step = lc.step(LifecycleEvent::WaitFailed("ECHILD".into()));
        assert_eq!(
            step.commands,
            vec![
                LifecycleCommand::TeardownSignalRoutes,
                LifecycleCommand::Settle(Settlement::Failed(SpawnFailure::Other("ECHILD".into()))),
            ]
        );
    }

    #[test]
    fn unknown_pid_skips_signal_routes() {
        let mut lc = ProcessLifecycle::new();
        assert!(lc.step(LifecycleEvent::Spawned { pid: None }).commands.is_empty());
        let step = lc.step(LifecycleEvent::Closed(Termination::Code(Some(0))));
        assert_eq!(
            step.commands,
            vec![LifecycleCommand::Settle(Settlement::Exited { code: 0 })]
        );
    }
}
