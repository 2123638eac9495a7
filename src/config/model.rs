// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{ProtectionMode, Scope};

/// Default text substituted for secrets in redact mode.
pub const DEFAULT_REDACT_TEXT: &str = "[REDACTED]";

/// Default directory holding the vault, key files and access token.
pub const DEFAULT_STATE_DIR: &str = ".runwarden";

/// Raw configuration as read from a TOML file.
///
/// ```toml
/// [monitor]
/// mode = "redact"
/// redact_text = "***"
/// patterns = ["acme_[a-z0-9]{24}"]
///
/// [scopes.production]
/// mode = "block"
///
/// [vault]
/// state_dir = ".runwarden"
///
/// [cloud]
/// api_url = "https://vault.example.com"
/// project_id = "proj_123"
/// ```
///
/// All sections are optional. Use `Config::try_from` to obtain a validated
/// [`Config`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub monitor: MonitorSection,

    /// Per-scope protection overrides from `[scopes.<scope>]`.
    ///
    /// Keys are checked against [`Scope`] during validation.
    #[serde(default)]
    pub scopes: BTreeMap<String, ScopeSection>,

    #[serde(default)]
    pub vault: VaultSection,

    /// Linked cloud project used for remote key retrieval.
    #[serde(default)]
    pub cloud: Option<CloudSection>,
}

/// `[monitor]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorSection {
    #[serde(default)]
    pub mode: Option<ProtectionMode>,

    #[serde(default)]
    pub redact_text: Option<String>,

    /// Extra regexes treated as secrets, on top of the built-in ones.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// JSON-lines file that exposure events are appended to on shutdown.
    #[serde(default)]
    pub events_log: Option<PathBuf>,
}

/// `[scopes.<scope>]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeSection {
    #[serde(default)]
    pub mode: Option<ProtectionMode>,

    #[serde(default)]
    pub redact_text: Option<String>,
}

/// `[vault]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VaultSection {
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_DIR)
}

impl Default for VaultSection {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

/// `[cloud]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloudSection {
    pub api_url: String,
    pub project_id: String,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfig>` (see `validate.rs`) or
/// [`Config::default`], so holders can rely on the invariants checked there.
#[derive(Debug, Clone, Default)]
pub struct Config {
    monitor: MonitorSection,
    scopes: BTreeMap<Scope, ScopeSection>,
    vault: VaultSection,
    cloud: Option<CloudSection>,
}

impl Config {
    pub(crate) fn new_unchecked(
        monitor: MonitorSection,
        scopes: BTreeMap<Scope, ScopeSection>,
        vault: VaultSection,
        cloud: Option<CloudSection>,
    ) -> Self {
        Self {
            monitor,
            scopes,
            vault,
            cloud,
        }
    }

    pub fn monitor(&self) -> &MonitorSection {
        &self.monitor
    }

    pub fn scope(&self, scope: Scope) -> Option<&ScopeSection> {
        self.scopes.get(&scope)
    }

    pub fn vault(&self) -> &VaultSection {
        &self.vault
    }

    pub fn cloud(&self) -> Option<&CloudSection> {
        self.cloud.as_ref()
    }
}
