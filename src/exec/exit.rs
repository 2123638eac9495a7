// src/exec/exit.rs

//! Exit status normalization.

use std::process::ExitStatus;

use nix::libc;

/// How the child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Normal exit; `None` if the platform reported no code.
    Code(Option<i32>),
    /// Killed by this signal number.
    Signal(i32),
}

impl Termination {
    pub fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Termination::Signal(signal);
            }
        }
        Termination::Code(status.code())
    }

    /// Exit code reported to the calling shell.
    pub fn exit_code(&self) -> i32 {
        match *self {
            Termination::Code(code) => code.unwrap_or(0),
            Termination::Signal(signal) => signal_exit_code(signal),
        }
    }
}

/// Shell-style code for a signal-terminated child.
///
/// SIGINT, SIGTERM and SIGHUP get their conventional `128 + n` values; any
/// other signal is reported as a plain `128`.
pub fn signal_exit_code(signal: i32) -> i32 {
    match signal {
        libc::SIGINT => 130,
        libc::SIGTERM => 143,
        libc::SIGHUP => 129,
        _ => 128,
    }
}
