//! 类型系统模块：Messages API 的请求/响应结构。
//!
//! # Types Module
//!
//! Strongly-typed representation of the Messages API wire format used by the
//! assistant.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ChatRequest`] | Request body: model, token budget, messages, MCP servers |
//! | [`ChatMessage`] | One `{role, content}` message |
//! | [`McpServerConfig`] | Remote tool server descriptor (`{type, url, name}`) |
//! | [`ChatResponse`] | Parsed reply; everything optional but `content` |
//! | [`ContentBlock`] | `text`, `tool_use` or `tool_result` unit of content |
//! | [`DecodedBody`] | Structured reply or the raw-text fallback |
//!
//! ## Example
//!
//! ```rust
//! use mcp_assistant::types::{decode_body, DecodedBody};
//!
//! let body = r#"{"content":[{"type":"text","text":"A"},{"type":"text","text":"B"}]}"#;
//! let decoded = decode_body(body);
//! assert!(matches!(decoded, DecodedBody::Structured(_)));
//! assert_eq!(decoded.into_answer(), "A\n\nB");
//! ```

pub mod message;
pub mod response;
pub mod tool;

pub use message::{ChatMessage, ChatRequest, McpServerConfig, MessageRole};
pub use response::{
    decode_body, AnswerSource, ApiErrorBlock, ChatResponse, ContentBlock, DecodedBody, Usage,
    EMPTY_TOOL_RESULT, NO_ANSWER,
};
pub use tool::{ToolResult, ToolUse};
