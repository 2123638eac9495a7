// src/secrets/mod.rs

//! Secret resolution.
//!
//! The vault itself (storage, encryption, key rotation) lives outside this
//! crate. Runwarden only talks to it through two narrow traits:
//!
//! - [`KeySource`] yields the decryption key for a scope, as a tagged
//!   [`KeyLookup`] outcome instead of an error chain.
//! - [`SecretProvider`] turns `(service, scope, key)` into a map of variables.
//!
//! [`EnvironmentResolver`] strings them together (local key first, then the
//! remote one) and never fails: any problem yields an empty map.
//!
//! Reference implementations: [`LocalKeyStore`], [`RemoteKeySource`] and
//! [`FileVault`].

use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::errors::ProviderError;
use crate::types::{BoxFuture, Scope};

pub mod local;
pub mod remote;
pub mod resolver;
pub mod vault;

pub use local::LocalKeyStore;
pub use remote::RemoteKeySource;
pub use resolver::EnvironmentResolver;
pub use vault::FileVault;

/// Secret variable name to value.
pub type SecretMap = BTreeMap<String, String>;

/// Decryption key for one scope of the vault.
#[derive(Clone, PartialEq, Eq)]
pub struct VaultKey(String);

impl VaultKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Hex-encoded SHA-256 of the key, as stored next to the variables.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultKey(***)")
    }
}

/// Outcome of a single key lookup attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLookup {
    Found(VaultKey),
    NotFound,
    NetworkError(String),
}

/// Somewhere a scope's decryption key can come from.
pub trait KeySource: Send + Sync {
    fn lookup(&self, scope: Scope) -> BoxFuture<'_, KeyLookup>;
}

/// The secret vault as seen by the supervisor.
pub trait SecretProvider: Send + Sync {
    fn is_initialized(&self) -> bool;

    /// Fetch and decrypt the variables for `scope`, narrowed to `service` if
    /// given. Fails with [`ProviderError::NotInitialized`] when the vault
    /// has not been set up.
    fn get_variables<'a>(
        &'a self,
        service: Option<&'a str>,
        scope: Scope,
        key: &'a VaultKey,
    ) -> BoxFuture<'a, Result<SecretMap, ProviderError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_the_key() {
        let key = VaultKey::new("hunter2");
        assert!(!format!("{key:?}").contains("hunter2"));
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        let key = VaultKey::new("abc");
        assert_eq!(
            key.fingerprint(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
