// src/config/mod.rs

//! Persisted configuration for runwarden.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into a [`Config`] (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_for_run, load_for_run_in, load_from_path};
pub use model::{
    CloudSection, Config, DEFAULT_REDACT_TEXT, DEFAULT_STATE_DIR, MonitorSection, RawConfig,
    ScopeSection, VaultSection,
};
