//! 客户端模块：请求构建、重试与错误分类。
//!
//! Resilient client for the Messages API with MCP servers attached.
//!
//! - [`builder`]: validated construction, with a base URL override for tests
//! - [`core`]: one question in, one answer string out
//! - [`error_classification`]: retry predicate and terminal error mapping

pub mod builder;
pub mod core;
pub mod error_classification;

pub use builder::McpClientBuilder;
pub use core::McpClient;
pub use error_classification::{classify, classify_status, is_retryable};
