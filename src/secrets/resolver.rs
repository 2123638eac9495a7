// src/secrets/resolver.rs

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::ProviderError;
use crate::secrets::{
    FileVault, KeyLookup, KeySource, LocalKeyStore, RemoteKeySource, SecretMap, SecretProvider,
    VaultKey,
};
use crate::types::Scope;

/// Resolves the secret variables for a run.
///
/// Resolution never aborts the run: a missing vault, a missing key, a failed
/// network call or a corrupt vault file all end up as an empty map plus a
/// warning.
#[derive(Clone)]
pub struct EnvironmentResolver {
    provider: Arc<dyn SecretProvider>,
    local: Arc<dyn KeySource>,
    remote: Option<Arc<dyn KeySource>>,
}

impl EnvironmentResolver {
    pub fn new(
        provider: Arc<dyn SecretProvider>,
        local: Arc<dyn KeySource>,
        remote: Option<Arc<dyn KeySource>>,
    ) -> Self {
        Self {
            provider,
            local,
            remote,
        }
    }

    /// Production wiring: file vault + local keys + (optional) cloud keys.
    pub fn from_config(config: &Config) -> Self {
        let state_dir = &config.vault().state_dir;
        let remote = RemoteKeySource::from_config(config)
            .map(|r| Arc::new(r) as Arc<dyn KeySource>);

        Self::new(
            Arc::new(FileVault::in_state_dir(state_dir)),
            Arc::new(LocalKeyStore::in_state_dir(state_dir)),
            remote,
        )
    }

    pub async fn resolve(&self, scope: Scope, service: Option<&str>) -> SecretMap {
        match self.try_resolve(scope, service).await {
            Ok(vars) => {
                info!(%scope, count = vars.len(), "resolved secrets");
                vars
            }
            Err(e) => {
                warn!(%scope, error = %e, "secrets unavailable; continuing without them");
                SecretMap::new()
            }
        }
    }

    async fn try_resolve(
        &self,
        scope: Scope,
        service: Option<&str>,
    ) -> Result<SecretMap, ProviderError> {
        if !self.provider.is_initialized() {
            return Err(ProviderError::NotInitialized);
        }

        let key = self.obtain_key(scope).await?;
        self.provider.get_variables(service, scope, &key).await
    }

    /// Local key first; a single remote attempt only if the local lookup
    /// came back empty-handed.
    async fn obtain_key(&self, scope: Scope) -> Result<VaultKey, ProviderError> {
        match self.local.lookup(scope).await {
            KeyLookup::Found(key) => return Ok(key),
            KeyLookup::NotFound => debug!(%scope, "no local key"),
            KeyLookup::NetworkError(reason) => debug!(%scope, %reason, "local key lookup failed"),
        }

        let Some(remote) = self.remote.as_ref() else {
            return Err(ProviderError::KeyUnavailable(scope.to_string()));
        };

        match remote.lookup(scope).await {
            KeyLookup::Found(key) => {
                debug!(%scope, "using remote decryption key");
                Ok(key)
            }
            KeyLookup::NotFound => Err(ProviderError::KeyUnavailable(scope.to_string())),
            KeyLookup::NetworkError(reason) => Err(ProviderError::Other(anyhow::anyhow!(
                "remote key fetch failed: {reason}"
            ))),
        }
    }
}
