// src/secrets/vault.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::errors::ProviderError;
use crate::secrets::{SecretMap, SecretProvider, VaultKey};
use crate::types::{BoxFuture, Scope};

/// On-disk layout of `<state_dir>/vault/<scope>.toml`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScopeFile {
    key_fingerprint: String,

    #[serde(default)]
    variables: SecretMap,

    #[serde(default)]
    services: BTreeMap<String, SecretMap>,
}

/// File-backed reference vault.
///
/// Variables are stored in clear text; the scope key only has to match the
/// fingerprint recorded in the file. Encrypted stores plug in through
/// [`SecretProvider`] instead.
#[derive(Debug, Clone)]
pub struct FileVault {
    root: PathBuf,
}

impl FileVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Vault under `<state_dir>/vault`.
    pub fn in_state_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join("vault"))
    }

    pub fn scope_path(&self, scope: Scope) -> PathBuf {
        self.root.join(format!("{scope}.toml"))
    }

    async fn load(
        &self,
        service: Option<&str>,
        scope: Scope,
        key: &VaultKey,
    ) -> Result<SecretMap, ProviderError> {
        if !self.is_initialized() {
            return Err(ProviderError::NotInitialized);
        }

        let path = self.scope_path(scope);
        if !tokio::fs::try_exists(&path).await? {
            debug!(%scope, path = %path.display(), "no variables stored for scope");
            return Ok(SecretMap::new());
        }

        let contents = tokio::fs::read_to_string(&path).await?;
        let file: ScopeFile = toml::from_str(&contents)?;

        if !file
            .key_fingerprint
            .trim()
            .eq_ignore_ascii_case(&key.fingerprint())
        {
            return Err(ProviderError::KeyMismatch(scope.to_string()));
        }

        let ScopeFile {
            mut variables,
            mut services,
            ..
        } = file;

        if let Some(name) = service {
            let overlay = services
                .remove(name)
                .ok_or_else(|| ProviderError::UnknownService {
                    service: name.to_string(),
                    scope: scope.to_string(),
                })?;
            variables.extend(overlay);
        }

        Ok(variables)
    }
}

impl SecretProvider for FileVault {
    fn is_initialized(&self) -> bool {
        self.root.is_dir()
    }

    fn get_variables<'a>(
        &'a self,
        service: Option<&'a str>,
        scope: Scope,
        key: &'a VaultKey,
    ) -> BoxFuture<'a, Result<SecretMap, ProviderError>> {
        Box::pin(self.load(service, scope, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_scope(vault: &FileVault, scope: Scope, key: &VaultKey, body: &str) {
        std::fs::create_dir_all(&vault.root).unwrap();
        let contents = format!("key_fingerprint = \"{}\"\n{body}", key.fingerprint());
        std::fs::write(vault.scope_path(scope), contents).unwrap();
    }

    #[tokio::test]
    async fn uninitialized_vault_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FileVault::new(dir.path().join("vault"));
        let err = vault
            .get_variables(None, Scope::Development, &VaultKey::new("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotInitialized));
    }

    #[tokio::test]
    async fn service_table_overlays_scope_variables() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FileVault::in_state_dir(dir.path());
        let key = VaultKey::new("dev-key");
        write_scope(
            &vault,
            Scope::Development,
            &key,
            r#"
[variables]
DATABASE_URL = "postgres://local"
API_TOKEN = "base"

[services.billing]
API_TOKEN = "billing-token"
"#,
        );

        let all = vault
            .get_variables(Some("billing"), Scope::Development, &key)
            .await
            .unwrap();
        assert_eq!(all.get("DATABASE_URL").map(String::as_str), Some("postgres://local"));
        assert_eq!(all.get("API_TOKEN").map(String::as_str), Some("billing-token"));

        let err = vault
            .get_variables(Some("search"), Scope::Development, &key)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownService { .. }));
    }

    #[tokio::test]
    async fn wrong_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FileVault::in_state_dir(dir.path());
        write_scope(&vault, Scope::Staging, &VaultKey::new("right"), "[variables]\nA = \"1\"\n");

        let err = vault
            .get_variables(None, Scope::Staging, &VaultKey::new("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::KeyMismatch(s) if s == "staging"));
    }

    #[tokio::test]
    async fn missing_scope_file_yields_no_variables() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FileVault::in_state_dir(dir.path());
        std::fs::create_dir_all(dir.path().join("vault")).unwrap();

        let vars = vault
            .get_variables(None, Scope::Production, &VaultKey::new("k"))
            .await
            .unwrap();
        assert!(vars.is_empty());
    }
}
