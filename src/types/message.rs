//! Outbound message model for the Messages API with MCP servers attached.

use serde::{Deserialize, Serialize};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single `{role, content}` entry of the request's message list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: text.into(),
        }
    }
}

/// Descriptor of a remote tool server the endpoint may call mid-generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub name: String,
}

impl McpServerConfig {
    /// URL-addressed server (`type: "url"`).
    pub fn url(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: "url".to_string(),
            url: url.into(),
            name: name.into(),
        }
    }
}

/// Request body for `POST {base}/messages`.
///
/// Built fresh for every attempt and never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
    pub mcp_servers: Vec<McpServerConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_wire_field_names() {
        let req = ChatRequest {
            model: "claude-3-5-sonnet-20241022".into(),
            max_tokens: 1024,
            messages: vec![ChatMessage::user("こんにちは")],
            mcp_servers: vec![McpServerConfig::url(
                "https://example.com/sse",
                "handbook",
            )],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "claude-3-5-sonnet-20241022");
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "こんにちは");
        assert_eq!(json["mcp_servers"][0]["type"], "url");
        assert_eq!(json["mcp_servers"][0]["url"], "https://example.com/sse");
        assert_eq!(json["mcp_servers"][0]["name"], "handbook");
    }
}
