use crate::config::ClientConfig;
use crate::types::ChatRequest;
use crate::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

const API_KEY_HEADER: &str = "x-api-key";
const VERSION_HEADER: &str = "anthropic-version";
const BETA_HEADER: &str = "anthropic-beta";

/// Longest slice of an error body kept in [`Error::Remote`] messages.
const MAX_ERROR_BODY: usize = 512;

/// Owns the connection pool for one client lifetime.
///
/// Three bounds apply to every request: connect, socket idle (read) and
/// total request time. Exceeding any of them is a transport failure.
pub struct HttpTransport {
    client: reqwest::Client,
    messages_url: String,
    api_key: String,
    anthropic_version: String,
    beta: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeouts.connect())
            .read_timeout(config.timeouts.socket())
            .timeout(config.timeouts.request())
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            messages_url: config.messages_url(),
            api_key: api_key.into(),
            anthropic_version: config.anthropic_version.clone(),
            beta: config.beta_header(),
        })
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }

    /// `POST {base}/messages` and return the raw response body.
    ///
    /// Non-2xx statuses become [`Error::Remote`]; the body is not decoded here.
    pub async fn post_messages(&self, request: &ChatRequest) -> Result<String> {
        let body = serde_json::to_vec(request)?;
        debug!(url = %self.messages_url, bytes = body.len(), "sending messages request");

        let mut req = self
            .client
            .post(&self.messages_url)
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .header(VERSION_HEADER, &self.anthropic_version);
        if !self.beta.is_empty() {
            req = req.header(BETA_HEADER, &self.beta);
        }

        let start = std::time::Instant::now();
        let resp = req
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::from(e)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::Transport(TransportError::from(e)))?;

        info!(
            http_status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            body_len = text.len(),
            "messages response received"
        );

        if !status.is_success() {
            return Err(Error::Remote {
                status: status.as_u16(),
                message: remote_message(&text),
            });
        }
        Ok(text)
    }
}

/// Prefer the structured `error.message`; otherwise a bounded slice of the body.
fn remote_message(body: &str) -> String {
    let structured = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
        });
    match structured {
        Some(msg) => msg,
        None => body.chars().take(MAX_ERROR_BODY).collect(),
    }
}

/// Boxed cause kept as the `source()` of a [`TransportError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connect timeout: {0}")]
    ConnectTimeout(#[source] BoxError),

    #[error("Socket timeout: {0}")]
    SocketTimeout(#[source] BoxError),

    #[error("Connection failed: {0}")]
    Connect(#[source] BoxError),

    #[error("HTTP error: {0}")]
    Http(#[source] BoxError),

    #[error("Transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let (is_timeout, is_connect) = (e.is_timeout(), e.is_connect());
        TransportError::from_flags(is_timeout, is_connect, Box::new(e))
    }
}

impl TransportError {
    /// Pick the variant from the client's timeout/connect flags.
    ///
    /// A timeout during connection setup is a connect timeout; any other
    /// timeout (socket idle or total budget) is a socket timeout.
    pub fn from_flags(is_timeout: bool, is_connect: bool, cause: BoxError) -> Self {
        match (is_timeout, is_connect) {
            (true, true) => TransportError::ConnectTimeout(cause),
            (true, false) => TransportError::SocketTimeout(cause),
            (false, true) => TransportError::Connect(cause),
            (false, false) => TransportError::Http(cause),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectTimeout(_) | TransportError::SocketTimeout(_)
        )
    }
}
