// src/types.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Boxed future returned by the collaborator traits.
///
/// Keeps the traits object-safe so production and fake implementations can be
/// swapped behind `Arc<dyn ...>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Deployment scope a run belongs to.
///
/// Selects which variable set is loaded from the vault and which protection
/// defaults (`[scopes.<scope>]`) apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Development,
    Staging,
    Production,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Development, Scope::Staging, Scope::Production];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Development => "development",
            Scope::Staging => "staging",
            Scope::Production => "production",
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::Development
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" => Ok(Scope::Development),
            "staging" => Ok(Scope::Staging),
            "production" => Ok(Scope::Production),
            other => Err(format!(
                "invalid scope: {other} (expected \"development\", \"staging\" or \"production\")"
            )),
        }
    }
}

/// What the output inspection pipeline does when it finds a secret.
///
/// - `Detect`: record the exposure, pass the output through untouched.
/// - `Redact`: replace every match with the redaction text.
/// - `Block`: drop the whole line containing a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtectionMode {
    Detect,
    Redact,
    Block,
}

impl ProtectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtectionMode::Detect => "detect",
            ProtectionMode::Redact => "redact",
            ProtectionMode::Block => "block",
        }
    }
}

impl Default for ProtectionMode {
    fn default() -> Self {
        ProtectionMode::Detect
    }
}

impl fmt::Display for ProtectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "detect" => Ok(ProtectionMode::Detect),
            "redact" => Ok(ProtectionMode::Redact),
            "block" => Ok(ProtectionMode::Block),
            other => Err(format!(
                "invalid mode: {other} (expected \"detect\", \"redact\" or \"block\")"
            )),
        }
    }
}
