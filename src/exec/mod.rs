// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`env`] builds the child environment.
//! - [`lifecycle`] is the pure state machine that decides what happens when.
//! - [`supervisor`] spawns the child and carries the lifecycle's commands out.
//! - [`signals`] relays SIGINT/SIGTERM/SIGHUP to the child.
//! - [`stream`] pumps piped output through the monitor's transforms.
//! - [`exit`] maps wait statuses to exit codes.

pub mod env;
pub mod exit;
pub mod lifecycle;
pub mod signals;
pub mod stream;
pub mod supervisor;

pub use env::{EnvironmentSet, SESSION_ID_VAR};
pub use exit::{Termination, signal_exit_code};
pub use lifecycle::{LifecycleCommand, LifecycleEvent, ProcessLifecycle, Settlement, SpawnFailure};
pub use signals::{ChildSignaller, PidSignaller, RelaySignal, SignalFallback, SignalRoute};
pub use supervisor::{OutputSink, StreamTransforms, Supervisor};
