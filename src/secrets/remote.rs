// src/secrets/remote.rs

//! Remote key retrieval from the linked cloud project.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{CloudSection, Config};
use crate::secrets::{KeyLookup, KeySource, VaultKey};
use crate::types::{BoxFuture, Scope};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable holding the cloud access token.
pub const TOKEN_ENV_VAR: &str = "RUNWARDEN_TOKEN";

#[derive(Debug, Deserialize)]
struct KeyResponse {
    key: String,
}

/// Fetches a scope's key with
/// `GET {api_url}/v1/projects/{project_id}/keys/{scope}`.
#[derive(Debug, Clone)]
pub struct RemoteKeySource {
    client: reqwest::Client,
    api_url: String,
    project_id: String,
    token: String,
}

impl RemoteKeySource {
    pub fn new(cloud: &CloudSection, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("runwarden/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building HTTP client for remote key retrieval")?;

        Ok(Self {
            client,
            api_url: cloud.api_url.trim().trim_end_matches('/').to_string(),
            project_id: cloud.project_id.trim().to_string(),
            token: token.into(),
        })
    }

    /// Build a remote key source if a cloud project is linked and an access
    /// token is stored. Returns `None` otherwise.
    pub fn from_config(config: &Config) -> Option<Self> {
        let cloud = config.cloud()?;
        let Some(token) = stored_token(&config.vault().state_dir) else {
            debug!("cloud project linked but no access token stored; remote keys disabled");
            return None;
        };

        match Self::new(cloud, token) {
            Ok(source) => Some(source),
            Err(e) => {
                warn!(error = %e, "remote key retrieval unavailable");
                None
            }
        }
    }

    pub fn key_url(&self, scope: Scope) -> String {
        format!(
            "{}/v1/projects/{}/keys/{}",
            self.api_url, self.project_id, scope
        )
    }

    async fn fetch(&self, scope: Scope) -> KeyLookup {
        let url = self.key_url(scope);
        debug!(%scope, %url, "fetching decryption key from cloud");

        let response = match self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return KeyLookup::NetworkError(e.to_string()),
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return KeyLookup::NotFound;
        }
        if !status.is_success() {
            return KeyLookup::NetworkError(format!("unexpected status {status} from {url}"));
        }

        match response.json::<KeyResponse>().await {
            Ok(body) if !body.key.trim().is_empty() => {
                KeyLookup::Found(VaultKey::new(body.key.trim()))
            }
            Ok(_) => KeyLookup::NotFound,
            Err(e) => KeyLookup::NetworkError(format!("invalid key response: {e}")),
        }
    }
}

impl KeySource for RemoteKeySource {
    fn lookup(&self, scope: Scope) -> BoxFuture<'_, KeyLookup> {
        Box::pin(self.fetch(scope))
    }
}

/// Access token from `RUNWARDEN_TOKEN`, else `<state_dir>/token`.
fn stored_token(state_dir: &Path) -> Option<String> {
    if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
        if !token.trim().is_empty() {
            return Some(token.trim().to_string());
        }
    }

    std::fs::read_to_string(state_dir.join("token"))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
