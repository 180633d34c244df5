//! API key storage.

use async_trait::async_trait;
use keyring::Entry;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{Error, ErrorContext, Result};

pub const DEFAULT_SERVICE: &str = "mcp-assistant";
pub const DEFAULT_ACCOUNT: &str = "mcp_api_key";

/// Where the API key lives. Every operation may fail independently.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self) -> Result<Option<String>>;

    async fn set_secret(&self, secret: &str) -> Result<()>;

    /// Removing a secret that does not exist is not an error.
    async fn clear_secret(&self) -> Result<()>;

    async fn has_secret(&self) -> Result<bool> {
        Ok(self.get_secret().await?.is_some())
    }
}

/// Secret kept in the OS credential store.
#[derive(Debug, Clone)]
pub struct KeyringSecretStore {
    service: String,
    account: String,
}

impl KeyringSecretStore {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    /// Run a blocking keyring call off the async executor.
    async fn with_entry<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> keyring::Result<T> + Send + 'static,
    {
        let service = self.service.clone();
        let account = self.account.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &account)?;
            f(entry)
        })
        .await
        .map_err(|e| keyring_error(op, e.to_string()))?;
        joined.map_err(|e| keyring_error(op, e.to_string()))
    }
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE, DEFAULT_ACCOUNT)
    }
}

fn keyring_error(op: &str, details: String) -> Error {
    Error::storage_with_context(
        format!("keyring {} failed", op),
        ErrorContext::new()
            .with_details(details)
            .with_source("keyring_secret_store"),
    )
}

#[async_trait]
impl SecretStore for KeyringSecretStore {
    async fn get_secret(&self) -> Result<Option<String>> {
        self.with_entry("read", |entry| match entry.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn set_secret(&self, secret: &str) -> Result<()> {
        let secret = secret.to_string();
        self.with_entry("write", move |entry| entry.set_password(&secret))
            .await?;
        debug!(service = %self.service, "api key stored");
        Ok(())
    }

    async fn clear_secret(&self) -> Result<()> {
        self.with_entry("delete", |entry| match entry.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        })
        .await?;
        debug!(service = %self.service, "api key cleared");
        Ok(())
    }
}

/// Process-local secret, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secret: RwLock<Option<String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: RwLock::new(Some(secret.into())),
        }
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret(&self) -> Result<Option<String>> {
        Ok(self.secret.read().await.clone())
    }

    async fn set_secret(&self, secret: &str) -> Result<()> {
        *self.secret.write().await = Some(secret.to_string());
        Ok(())
    }

    async fn clear_secret(&self) -> Result<()> {
        *self.secret.write().await = None;
        Ok(())
    }
}
