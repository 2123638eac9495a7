// src/exec/env.rs

//! Child environment assembly.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

use tokio::process::Command;
use tracing::{debug, warn};

use crate::secrets::SecretMap;

/// Variable carrying the monitoring session id into the child.
pub const SESSION_ID_VAR: &str = "RUNWARDEN_SESSION_ID";

/// The complete environment handed to the child.
///
/// Layering order: inherited environment, then secrets (when enabled), then
/// the session id. Later layers win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSet {
    vars: BTreeMap<OsString, OsString>,
    secrets_injected: usize,
}

impl EnvironmentSet {
    /// Start from the supervisor's own environment.
    pub fn inherit_current() -> Self {
        std::env::vars_os().collect()
    }

    /// Overlay `secrets` unless injection is disabled.
    pub fn with_secrets(mut self, secrets: &SecretMap, enabled: bool) -> Self {
        if !enabled {
            debug!(available = secrets.len(), "secret injection disabled");
            return self;
        }
        let mut injected = 0;
        for (key, value) in secrets.iter() {
            if let Some(reason) = unusable_entry(key, value) {
                warn!(key = %key.escape_debug(), reason, "skipping secret that cannot be exported");
                continue;
            }
            self.vars.insert(OsString::from(key), OsString::from(value));
            injected += 1;
        }
        self.secrets_injected = injected;
        self
    }

    pub fn with_session_id(mut self, session_id: Option<&str>) -> Self {
        if let Some(id) = session_id {
            self.vars.insert(SESSION_ID_VAR.into(), id.into());
        }
        self
    }

    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    /// Number of secret variables written into this environment.
    pub fn secrets_injected(&self) -> usize {
        self.secrets_injected
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Replace `cmd`'s environment with exactly this set.
    pub fn apply_to(&self, cmd: &mut Command) {
        cmd.env_clear();
        cmd.envs(self.vars.iter());
    }
}

/// Why `key=value` cannot be put into a process environment, if it can't.
fn unusable_entry(key: &str, value: &str) -> Option<&'static str> {
    if key.is_empty() {
        Some("empty name")
    } else if key.contains('=') {
        Some("name contains '='")
    } else if key.contains('\0') {
        Some("name contains a NUL byte")
    } else if value.contains('\0') {
        Some("value contains a NUL byte")
    } else {
        None
    }
}

impl<K, V> FromIterator<(K, V)> for EnvironmentSet
where
    K: Into<OsString>,
    V: Into<OsString>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            secrets_injected: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets(pairs: &[(&str, &str)]) -> SecretMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn secrets_override_inherited_values() {
        let env: EnvironmentSet = [("PATH", "/bin"), ("API_KEY", "old")].into_iter().collect();
        let env = env.with_secrets(&secrets(&[("API_KEY", "new"), ("DB", "pg")]), true);

        assert_eq!(env.get("API_KEY"), Some(OsStr::new("new")));
        assert_eq!(env.get("PATH"), Some(OsStr::new("/bin")));
        assert_eq!(env.secrets_injected(), 2);
    }

    #[test]
    fn disabled_injection_leaves_environment_untouched() {
        let base: EnvironmentSet = [("PATH", "/bin")].into_iter().collect();
        let env = base.clone().with_secrets(&secrets(&[("API_KEY", "x")]), false);

        assert_eq!(env, base);
        assert_eq!(env.secrets_injected(), 0);
        assert!(env.get("API_KEY").is_none());
    }

    #[test]
    fn unexportable_secrets_are_skipped() {
        let env = EnvironmentSet::default().with_secrets(
            &secrets(&[
                ("GOOD", "fine"),
                ("NUL_VALUE", "a\0b"),
                ("A=B", "x"),
                ("", "empty"),
                ("NUL\0KEY", "x"),
            ]),
            true,
        );

        assert_eq!(env.secrets_injected(), 1);
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("GOOD"), Some(OsStr::new("fine")));
    }

    #[test]
    fn session_id_is_added_last() {
        let env = EnvironmentSet::default()
            .with_secrets(&secrets(&[(SESSION_ID_VAR, "from-vault")]), true)
            .with_session_id(Some("abc"));
        assert_eq!(env.get(SESSION_ID_VAR), Some(OsStr::new("abc")));
    }

    #[test]
    fn no_session_means_no_session_var() {
        let env = EnvironmentSet::default().with_session_id(None);
        assert!(env.is_empty());
    }
}
