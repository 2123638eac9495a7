// src/request.rs

//! Validated run request.

use std::path::PathBuf;

use crate::cli::RunArgs;
use crate::errors::RunError;
use crate::types::{ProtectionMode, Scope};

/// A `runwarden run` invocation after validation.
///
/// Built once from the CLI and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub command: String,
    pub args: Vec<String>,
    pub scope: Scope,
    pub service: Option<String>,
    pub secrets_enabled: bool,
    pub monitor_enabled: bool,
    pub mode: Option<ProtectionMode>,
    pub redact_text: Option<String>,
    pub verbose: bool,
    pub quiet: bool,
    pub config: Option<PathBuf>,
}

impl TryFrom<RunArgs> for RunRequest {
    type Error = RunError;

    fn try_from(args: RunArgs) -> Result<Self, Self::Error> {
        let scope: Scope = args.scope.parse().map_err(RunError::Usage)?;

        let mode = args
            .mode
            .as_deref()
            .map(str::parse::<ProtectionMode>)
            .transpose()
            .map_err(RunError::Usage)?;

        let mut argv = args.command.into_iter();
        let command = match argv.next() {
            Some(cmd) if !cmd.trim().is_empty() => cmd,
            _ => return Err(RunError::Usage("no command given".to_string())),
        };

        let service = args.service.filter(|s| !s.trim().is_empty());

        Ok(RunRequest {
            command,
            args: argv.collect(),
            scope,
            service,
            secrets_enabled: !args.no_secrets,
            monitor_enabled: !args.no_monitor,
            mode,
            redact_text: args.redact_text,
            verbose: args.verbose,
            quiet: args.quiet,
            config: args.config.map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(scope: &str, command: &[&str]) -> RunArgs {
        RunArgs {
            scope: scope.to_string(),
            command: command.iter().map(|s| s.to_string()).collect(),
            ..RunArgs::default()
        }
    }

    #[test]
    fn splits_command_from_its_arguments() {
        let req = RunRequest::try_from(args("production", &["sh", "-c", "true"])).unwrap();
        assert_eq!(req.command, "sh");
        assert_eq!(req.args, vec!["-c", "true"]);
        assert_eq!(req.scope, Scope::Production);
        assert!(req.secrets_enabled);
        assert!(req.monitor_enabled);
    }

    #[test]
    fn rejects_unknown_scope() {
        let err = RunRequest::try_from(args("qa", &["true"])).unwrap_err();
        assert!(matches!(err, RunError::Usage(msg) if msg.contains("qa")));
    }

    #[test]
    fn rejects_unknown_mode() {
        let mut a = args("development", &["true"]);
        a.mode = Some("shred".to_string());
        let err = RunRequest::try_from(a).unwrap_err();
        assert!(matches!(err, RunError::Usage(msg) if msg.contains("shred")));
    }

    #[test]
    fn rejects_missing_command() {
        let err = RunRequest::try_from(args("development", &[])).unwrap_err();
        assert!(matches!(err, RunError::Usage(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn negative_flags_disable_features() {
        let mut a = args("staging", &["env"]);
        a.no_secrets = true;
        a.no_monitor = true;
        let req = RunRequest::try_from(a).unwrap();
        assert!(!req.secrets_enabled);
        assert!(!req.monitor_enabled);
    }
}
