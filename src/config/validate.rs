// src/config/validate.rs

use std::collections::BTreeMap;

use crate::config::model::{CloudSection, Config, RawConfig, ScopeSection};
use crate::errors::{Result, RunError};
use crate::types::Scope;

impl TryFrom<RawConfig> for Config {
    type Error = RunError;

    fn try_from(raw: RawConfig) -> std::result::Result<Self, Self::Error> {
        validate_redact_text("[monitor].redact_text", raw.monitor.redact_text.as_deref())?;
        let scopes = validate_scopes(raw.scopes)?;
        if let Some(cloud) = raw.cloud.as_ref() {
            validate_cloud(cloud)?;
        }
        Ok(Config::new_unchecked(raw.monitor, scopes, raw.vault, raw.cloud))
    }
}

fn validate_redact_text(field: &str, text: Option<&str>) -> Result<()> {
    match text {
        Some(t) if t.is_empty() => Err(RunError::Config(format!("{field} must not be empty"))),
        _ => Ok(()),
    }
}

fn validate_scopes(
    raw: BTreeMap<String, ScopeSection>,
) -> Result<BTreeMap<Scope, ScopeSection>> {
    let mut scopes = BTreeMap::new();
    for (name, section) in raw {
        let scope: Scope = name
            .parse()
            .map_err(|e: String| RunError::Config(format!("[scopes.{name}]: {e}")))?;
        validate_redact_text(
            &format!("[scopes.{name}].redact_text"),
            section.redact_text.as_deref(),
        )?;
        scopes.insert(scope, section);
    }
    Ok(scopes)
}

fn validate_cloud(cloud: &CloudSection) -> Result<()> {
    let url = cloud.api_url.trim();
    if url.is_empty() {
        return Err(RunError::Config(
            "[cloud].api_url must not be empty".to_string(),
        ));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(RunError::Config(format!(
            "[cloud].api_url must be an http(s) URL (got '{url}')"
        )));
    }
    if cloud.project_id.trim().is_empty() {
        return Err(RunError::Config(
            "[cloud].project_id must not be empty".to_string(),
        ));
    }
    Ok(())
}
