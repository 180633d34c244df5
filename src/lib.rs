//! # mcp-assistant
//!
//! 基于 Anthropic Messages API 与远程 MCP 工具服务器的问答助手。
//!
//! A question-answering assistant: a question goes to the Anthropic Messages
//! API with a remote MCP tool server attached, the answer is extracted from
//! the multi-part response, and the pair is kept in a local history.
//!
//! ## Overview
//!
//! - **Resilient client**: [`McpClient`] builds the request, enforces connect /
//!   socket / total timeouts, and extracts one plain-text answer.
//! - **Retry**: [`resilience::retry`] wraps the call with bounded exponential
//!   backoff, retrying only timeouts, HTTP 429 and 5xx.
//! - **Error taxonomy**: every terminal failure becomes one [`AppError`] with a
//!   localized message.
//! - **Storage**: API key in the OS keyring, history in a JSON file; both behind
//!   traits in [`storage`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcp_assistant::storage::{JsonFileConversationStore, KeyringSecretStore};
//! use mcp_assistant::{Assistant, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let history = JsonFileConversationStore::open("history.json").await?;
//!     let assistant = Assistant::new(
//!         ClientConfig::from_env()?,
//!         KeyringSecretStore::default(),
//!         history,
//!     );
//!
//!     if let Some(item) = assistant.ask("リモートワークの規定は？").await? {
//!         println!("{}", item.answer);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | API client, builder, error classification |
//! | [`resilience`] | Retry policy and backoff loop |
//! | [`types`] | Request/response wire model and answer extraction |
//! | [`transport`] | HTTP transport with timeout bounds |
//! | [`storage`] | Secret and history stores |
//! | [`config`] | Client configuration (defaults, env, YAML) |

pub mod app_error;
pub mod assistant;
pub mod client;
pub mod config;
pub mod resilience;
pub mod storage;
pub mod transport;
pub mod types;

pub use app_error::{AppError, AppErrorKind};
pub use assistant::{ApiKeyStatus, Assistant};
pub use client::{McpClient, McpClientBuilder};
pub use config::ClientConfig;
pub use resilience::RetryPolicy;
pub use types::{ChatRequest, ChatResponse, ContentBlock, DecodedBody};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
