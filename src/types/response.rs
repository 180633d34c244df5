//! Response model and answer extraction.
//!
//! Decoding is forward compatible: unknown fields are ignored and every field
//! except `content` is optional. A body that does not decode at all is kept as
//! [`DecodedBody::RawText`] instead of failing the call.

use serde::{Deserialize, Serialize};

use super::tool::{ToolResult, ToolUse};

/// Returned when neither text nor a tool result could be found.
pub const NO_ANSWER: &str = "回答を取得できませんでした。";

/// Returned when a `tool_result` block carries no result descriptor.
pub const EMPTY_TOOL_RESULT: &str = "ツール実行結果が空です。";

const TEXT: &str = "text";
const TOOL_RESULT: &str = "tool_result";

/// One discriminated unit of returned content.
///
/// The discriminator is kept as a string so that block types added by the
/// API later still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use: Option<ToolUse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResult>,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: TEXT.to_string(),
            text: Some(text.into()),
            tool_use: None,
            tool_result: None,
        }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: TOOL_RESULT.to_string(),
            text: None,
            tool_use: None,
            tool_result: Some(ToolResult {
                tool_use_id: tool_use_id.into(),
                content: content.into(),
            }),
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == TEXT
    }

    pub fn is_tool_result(&self) -> bool {
        self.kind == TOOL_RESULT
    }
}

/// Token usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Application-level error block embedded in a response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// Parsed reply from the completion endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub error: Option<ApiErrorBlock>,
}

/// Which rule produced the extracted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    /// The response carried an `error` block.
    ApiError,
    /// One or more non-empty text blocks.
    Text,
    /// First `tool_result` block.
    ToolResult,
    /// Nothing usable; the [`NO_ANSWER`] sentinel.
    Empty,
}

impl AnswerSource {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ApiError => "api_error",
            Self::Text => "text",
            Self::ToolResult => "tool_result",
            Self::Empty => "empty",
        }
    }
}

impl ChatResponse {
    /// Non-empty text blocks, in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content
            .iter()
            .filter(|b| b.is_text())
            .filter_map(|b| b.text.as_deref())
            .filter(|t| !t.is_empty())
    }

    /// Extract the answer and report which rule produced it.
    ///
    /// Priority: error block, joined text blocks, first tool result, sentinel.
    /// The returned string is never empty.
    pub fn extract(&self) -> (String, AnswerSource) {
        // TODO: surface the error block as a typed failure once callers can
        // handle it; until then it is reported as an answer string.
        if let Some(err) = &self.error {
            return (
                format!("API Error: {} - {}", err.kind, err.message),
                AnswerSource::ApiError,
            );
        }

        let texts: Vec<&str> = self.texts().collect();
        if !texts.is_empty() {
            return (texts.join("\n\n"), AnswerSource::Text);
        }

        if let Some(block) = self.content.iter().find(|b| b.is_tool_result()) {
            let content = block
                .tool_result
                .as_ref()
                .map(|r| r.content.clone())
                .unwrap_or_else(|| EMPTY_TOOL_RESULT.to_string());
            return (content, AnswerSource::ToolResult);
        }

        (NO_ANSWER.to_string(), AnswerSource::Empty)
    }

    pub fn extract_answer(&self) -> String {
        self.extract().0
    }
}

/// Result of decoding a response body.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedBody {
    /// The body matched the response schema.
    Structured(ChatResponse),
    /// The body did not decode; kept verbatim so the caller still gets text.
    RawText(String),
}

impl DecodedBody {
    pub fn is_structured(&self) -> bool {
        matches!(self, DecodedBody::Structured(_))
    }

    /// Final answer text for either decoding path.
    pub fn into_answer(self) -> String {
        match self {
            DecodedBody::Structured(resp) => resp.extract_answer(),
            DecodedBody::RawText(raw) => raw,
        }
    }
}

/// Decode a raw body, falling back to the raw text when it does not parse.
///
/// A blank body carries no answer at all and decodes as an empty response,
/// so extraction yields [`NO_ANSWER`] rather than an empty string.
pub fn decode_body(raw: &str) -> DecodedBody {
    if raw.trim().is_empty() {
        tracing::warn!(body_len = raw.len(), "empty response body");
        return DecodedBody::Structured(ChatResponse::default());
    }
    match serde_json::from_str::<ChatResponse>(raw) {
        Ok(resp) => DecodedBody::Structured(resp),
        Err(e) => {
            tracing::warn!(error = %e, body_len = raw.len(), "response did not match schema; using raw text");
            DecodedBody::RawText(raw.to_string())
        }
    }
}
