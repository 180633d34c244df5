use crate::config::ClientConfig;
use crate::resilience::{self, RetryError, RetryPolicy};
use crate::transport::HttpTransport;
use crate::types::{decode_body, ChatMessage, ChatRequest, DecodedBody};
use crate::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::builder::McpClientBuilder;
use super::error_classification::is_retryable;

/// Characters of question/answer text included in debug logs.
const LOG_PREVIEW_CHARS: usize = 100;

/// Turns a question into a single plain-text answer.
///
/// One client owns one connection pool. Call [`McpClient::close`] when done;
/// [`crate::Assistant`] does so after every question, success or failure.
pub struct McpClient {
    pub(crate) config: ClientConfig,
    pub(crate) transport: HttpTransport,
    pub(crate) retry: RetryPolicy,
}

impl McpClient {
    /// Client with the given configuration and API key.
    pub fn new(config: ClientConfig, api_key: impl Into<String>) -> Result<Self> {
        McpClientBuilder::new().config(config).api_key(api_key).build()
    }

    pub fn builder() -> McpClientBuilder {
        McpClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Request for `question`: configured model and token budget, the
    /// question verbatim as the only user message, and the MCP server list.
    pub fn build_request(&self, question: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            messages: vec![ChatMessage::user(question)],
            mcp_servers: self.config.mcp_servers.clone(),
        }
    }

    /// One attempt: send and decode, without extracting the answer.
    pub async fn exchange(&self, question: &str) -> Result<DecodedBody> {
        let request = self.build_request(question);
        info!(
            url = %self.transport.messages_url(),
            model = %request.model,
            mcp_servers = request.mcp_servers.len(),
            "sending question"
        );
        debug!(question = %preview(question), "question text");

        let raw = self.transport.post_messages(&request).await?;
        Ok(decode_body(&raw))
    }

    /// One attempt, no retry.
    pub async fn send_once(&self, question: &str) -> Result<String> {
        let answer = match self.exchange(question).await? {
            DecodedBody::Structured(resp) => {
                let (text, source) = resp.extract();
                info!(
                    source = source.name(),
                    blocks = resp.content.len(),
                    answer_len = text.len(),
                    "answer extracted"
                );
                text
            }
            DecodedBody::RawText(raw) => {
                info!(answer_len = raw.len(), "returning raw response text");
                raw
            }
        };
        debug!(answer = %preview(&answer), "answer text");
        Ok(answer)
    }

    /// Answer `question`, retrying transient failures under the client's policy.
    pub async fn send(&self, question: &str) -> Result<String> {
        resilience::retry(&self.retry, is_retryable, || self.send_once(question)).await
    }

    /// [`McpClient::send`] that stops early when `cancel` fires.
    pub async fn send_with_cancel(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, RetryError<crate::Error>> {
        resilience::retry_with_cancel(&self.retry, cancel, is_retryable, || {
            self.send_once(question)
        })
        .await
    }

    /// Release the connection pool.
    pub fn close(self) {
        debug!(url = %self.transport.messages_url(), "closing client");
        drop(self);
    }
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    if text.chars().count() > LOG_PREVIEW_CHARS {
        out.push('…');
    }
    out
}
