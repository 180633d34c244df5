//! Client configuration.
//!
//! Defaults target the public Anthropic endpoint; every value can be overridden
//! from a YAML file or from `MCP_ASSISTANT_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::resilience::RetryPolicy;
use crate::types::McpServerConfig;
use crate::{Error, ErrorContext, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_BETA_FEATURE: &str = "mcp-client-2025-04-04";
pub const DEFAULT_MCP_SERVER_URL: &str = "https://openhandbook.mcp.yumemi.jp/sse";
pub const DEFAULT_MCP_SERVER_NAME: &str = "yumemi-openhandbook";

const ENV_PREFIX: &str = "MCP_ASSISTANT_";

/// HTTP timeout budgets, each enforced independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Establishing the TCP/TLS connection.
    pub connect_timeout_ms: u64,
    /// Maximum idle time between reads on the socket.
    pub socket_timeout_ms: u64,
    /// Whole request, from send to the last body byte.
    pub request_timeout_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 30_000,
            socket_timeout_ms: 120_000,
            request_timeout_ms: 120_000,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn socket(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Serializable form of [`RetryPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryPolicy::for_tool_calls().into()
    }
}

impl From<RetryPolicy> for RetryConfig {
    fn from(p: RetryPolicy) -> Self {
        Self {
            max_attempts: p.max_attempts,
            initial_delay_ms: p.initial_delay.as_millis() as u64,
            max_delay_ms: p.max_delay.as_millis() as u64,
            multiplier: p.multiplier,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.multiplier,
        )
    }
}

/// Everything the API client needs apart from the API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub anthropic_version: String,
    /// Values joined into the `anthropic-beta` header.
    pub beta_features: Vec<String>,
    pub mcp_servers: Vec<McpServerConfig>,
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            anthropic_version: DEFAULT_ANTHROPIC_VERSION.to_string(),
            beta_features: vec![DEFAULT_BETA_FEATURE.to_string()],
            mcp_servers: vec![McpServerConfig::url(
                DEFAULT_MCP_SERVER_URL,
                DEFAULT_MCP_SERVER_NAME,
            )],
            timeouts: TimeoutConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `MCP_ASSISTANT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = Self::default().with_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(content).map_err(|e| {
            Error::configuration_with_context(
                format!("Invalid config: {}", e),
                ErrorContext::new().with_source("config_loader"),
            )
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("Cannot read config file: {}", e),
                ErrorContext::new()
                    .with_details(path.display().to_string())
                    .with_source("config_loader"),
            )
        })?;
        Self::from_yaml_str(&content)
    }

    /// Apply overrides from a key lookup. Unparsable numbers keep the current value.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let num = |name: &str| var(name).and_then(|s| s.parse::<u64>().ok());

        if let Some(v) = var("BASE_URL") {
            self.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = var("MODEL") {
            self.model = v;
        }
        if let Some(v) = var("MAX_TOKENS").and_then(|s| s.parse::<u32>().ok()) {
            self.max_tokens = v;
        }
        if let Some(v) = var("BETA") {
            self.beta_features = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(url) = var("MCP_URL") {
            let name = var("MCP_NAME").unwrap_or_else(|| DEFAULT_MCP_SERVER_NAME.to_string());
            self.mcp_servers = vec![McpServerConfig::url(url, name)];
        }
        if let Some(secs) = num("CONNECT_TIMEOUT_SECS") {
            self.timeouts.connect_timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(secs) = num("SOCKET_TIMEOUT_SECS") {
            self.timeouts.socket_timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(secs) = num("REQUEST_TIMEOUT_SECS") {
            self.timeouts.request_timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(n) = var("MAX_ATTEMPTS").and_then(|s| s.parse::<u32>().ok()) {
            self.retry.max_attempts = n;
        }
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.policy()
    }

    /// `POST` target for the Messages API.
    pub fn messages_url(&self) -> String {
        format!("{}/messages", self.base_url.trim_end_matches('/'))
    }

    pub fn beta_header(&self) -> String {
        self.beta_features.join(",")
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, msg: &str| {
            Err(Error::configuration_with_context(
                msg,
                ErrorContext::new()
                    .with_field_path(format!("config.{}", field))
                    .with_source("config_validator"),
            ))
        };

        match url::Url::parse(&self.base_url) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            _ => return invalid("base_url", "base_url must be an http(s) URL"),
        }
        if self.model.trim().is_empty() {
            return invalid("model", "model must not be empty");
        }
        if self.max_tokens == 0 {
            return invalid("max_tokens", "max_tokens must be positive");
        }
        if self.mcp_servers.is_empty() {
            return invalid("mcp_servers", "at least one MCP server is required");
        }
        for (field, ms) in [
            ("timeouts.connect_timeout_ms", self.timeouts.connect_timeout_ms),
            ("timeouts.socket_timeout_ms", self.timeouts.socket_timeout_ms),
            ("timeouts.request_timeout_ms", self.timeouts.request_timeout_ms),
        ] {
            if ms == 0 {
                return invalid(field, "timeouts must be positive");
            }
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts", "max_attempts must be at least 1");
        }
        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return invalid("retry.multiplier", "multiplier must be >= 1.0");
        }
        Ok(())
    }
}
