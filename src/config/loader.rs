// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::model::{Config, RawConfig};
use crate::errors::{Result, RunError};

/// Load a configuration file from a given path and return the raw `RawConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config> {
    let raw_config = load_from_path(&path)?;
    let config = Config::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the configuration for a run.
///
/// - An explicit `--config` path must exist and must be valid.
/// - Without one, `Runwarden.toml` in the current directory is used if it
///   exists and is valid; otherwise the built-in defaults apply.
pub fn load_for_run(explicit: Option<&Path>) -> Result<Config> {
    load_for_run_in(explicit, &default_config_path())
}

/// [`load_for_run`] with the implicit config location supplied by the caller.
pub fn load_for_run_in(explicit: Option<&Path>, default_path: &Path) -> Result<Config> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(RunError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return load_and_validate(path);
    }

    if !default_path.is_file() {
        debug!(path = %default_path.display(), "no config file; using defaults");
        return Ok(Config::default());
    }
    match load_and_validate(default_path) {
        Ok(config) => Ok(config),
        Err(error) => {
            warn!(
                path = %default_path.display(),
                %error,
                "ignoring invalid config file; using defaults"
            );
            Ok(Config::default())
        }
    }
}

/// Default config location: `Runwarden.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Runwarden.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultSection;

    fn assert_defaults(config: &Config) {
        assert!(config.monitor().mode.is_none());
        assert!(config.cloud().is_none());
        assert_eq!(config.vault().state_dir, VaultSection::default().state_dir);
    }

    #[test]
    fn missing_default_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_for_run_in(None, &dir.path().join("Runwarden.toml")).unwrap();
        assert_defaults(&config);
    }

    #[test]
    fn invalid_default_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Runwarden.toml");
        fs::write(&path, "[vault]\nstate_dir = 3\n").unwrap();

        let config = load_for_run_in(None, &path).unwrap();
        assert_defaults(&config);
    }

    #[test]
    fn invalid_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[monitor]\nmode = \"loud\"\n").unwrap();

        assert!(load_for_run_in(Some(&path), &dir.path().join("Runwarden.toml")).is_err());
    }

    #[test]
    fn explicit_file_wins_over_default() {
        let dir = tempfile::tempdir().unwrap();
        let default_path = dir.path().join("Runwarden.toml");
        fs::write(&default_path, "not toml at all [[[").unwrap();
        let explicit = dir.path().join("custom.toml");
        fs::write(
            &explicit,
            "[cloud]\napi_url = \"https://vault.example.com\"\nproject_id = \"proj_123\"\n",
        )
        .unwrap();

        let config = load_for_run_in(Some(&explicit), &default_path).unwrap();
        assert_eq!(config.cloud().map(|c| c.project_id.as_str()), Some("proj_123"));
    }
}
