//! Secret retrieval.

use std::collections::HashMap;

use async_trait::async_trait;
use fxflow_common::{FxFlowError, Result};
use tracing::info;

/// Name of the rate provider access key.
pub const API_KEY_SECRET: &str = "/fx/api/access_key";

/// Trait for secret stores.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a decrypted secret by its path-like name.
    async fn get_secret(&self, name: &str) -> Result<String>;
}

/// Resolves secrets from environment variables.
///
/// `/fx/api/access_key` is read from `FX_API_ACCESS_KEY`.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }

    /// Environment variable backing a secret name.
    pub fn env_var_name(name: &str) -> String {
        name.trim_start_matches('/')
            .replace(['/', '-', '.'], "_")
            .to_ascii_uppercase()
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_secret(&self, name: &str) -> Result<String> {
        let var = Self::env_var_name(name);
        info!(secret = name, "Retrieving secret from environment");
        std::env::var(&var)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| FxFlowError::external("secret-store", format!("{name} not found ({var} unset)")))
    }
}

/// Fixed secrets, for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get_secret(&self, name: &str) -> Result<String> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| FxFlowError::external("secret-store", format!("{name} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_name() {
        assert_eq!(EnvSecretStore::env_var_name(API_KEY_SECRET), "FX_API_ACCESS_KEY");
        assert_eq!(EnvSecretStore::env_var_name("/a-b/c.d"), "A_B_C_D");
    }

    #[tokio::test]
    async fn test_static_store() {
        let store = StaticSecretStore::new().with_secret(API_KEY_SECRET, "k-123");
        assert_eq!(store.get_secret(API_KEY_SECRET).await.unwrap(), "k-123");

        let err = store.get_secret("/other").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_env_store_missing_secret() {
        let store = EnvSecretStore::new();
        assert!(store.get_secret("/fxflow/test/never_set_secret").await.is_err());
    }
}
