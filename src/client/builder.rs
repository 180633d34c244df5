use crate::client::core::McpClient;
use crate::config::ClientConfig;
use crate::resilience::RetryPolicy;
use crate::transport::HttpTransport;
use crate::{Error, ErrorContext, Result};

/// Builder for creating clients with custom configuration.
///
/// The API key is required; everything else defaults from [`ClientConfig`].
pub struct McpClientBuilder {
    config: ClientConfig,
    api_key: Option<String>,
    retry: Option<RetryPolicy>,
    /// Override base URL (primarily for testing with mock servers)
    base_url_override: Option<String>,
}

impl McpClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            api_key: None,
            retry: None,
            base_url_override: None,
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Replace the retry policy from the configuration.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Override the configured base URL.
    ///
    /// This is primarily for testing with mock servers.
    pub fn base_url_override(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<McpClient> {
        let mut config = self.config;
        if let Some(base_url) = self.base_url_override {
            config.base_url = base_url;
        }
        config.validate()?;

        let api_key = self.api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            Error::configuration_with_context(
                "API key is required",
                ErrorContext::new()
                    .with_field_path("api_key")
                    .with_source("client_builder"),
            )
        })?;

        let retry = self.retry.unwrap_or_else(|| config.retry_policy());
        let transport = HttpTransport::new(&config, api_key)?;

        Ok(McpClient {
            config,
            transport,
            retry,
        })
    }
}

impl Default for McpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
