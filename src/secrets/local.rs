// src/secrets/local.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::secrets::{KeyLookup, KeySource, VaultKey};
use crate::types::{BoxFuture, Scope};

/// Decryption keys available on this machine.
///
/// Lookup order for a scope:
/// 1. `RUNWARDEN_KEY_<SCOPE>` (e.g. `RUNWARDEN_KEY_STAGING`)
/// 2. `<keys_dir>/<scope>.key`, trimmed
///
/// Never reports [`KeyLookup::NetworkError`].
#[derive(Debug, Clone)]
pub struct LocalKeyStore {
    keys_dir: PathBuf,
}

impl LocalKeyStore {
    pub fn new(keys_dir: impl Into<PathBuf>) -> Self {
        Self {
            keys_dir: keys_dir.into(),
        }
    }

    /// Key store under `<state_dir>/keys`.
    pub fn in_state_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join("keys"))
    }

    pub fn key_path(&self, scope: Scope) -> PathBuf {
        self.keys_dir.join(format!("{scope}.key"))
    }

    fn env_var_name(scope: Scope) -> String {
        format!("RUNWARDEN_KEY_{}", scope.as_str().to_uppercase())
    }

    async fn find(&self, scope: Scope) -> KeyLookup {
        if let Ok(value) = std::env::var(Self::env_var_name(scope)) {
            if !value.trim().is_empty() {
                debug!(%scope, "using decryption key from environment");
                return KeyLookup::Found(VaultKey::new(value.trim()));
            }
        }

        let path = self.key_path(scope);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) if !contents.trim().is_empty() => {
                debug!(%scope, path = %path.display(), "using local decryption key");
                KeyLookup::Found(VaultKey::new(contents.trim()))
            }
            Ok(_) => {
                debug!(%scope, path = %path.display(), "local key file is empty");
                KeyLookup::NotFound
            }
            Err(e) => {
                debug!(%scope, path = %path.display(), error = %e, "no local key");
                KeyLookup::NotFound
            }
        }
    }
}

impl KeySource for LocalKeyStore {
    fn lookup(&self, scope: Scope) -> BoxFuture<'_, KeyLookup> {
        Box::pin(self.find(scope))
    }
}
