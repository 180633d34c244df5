//! 问答流程：读取密钥、调用 API、保存历史。
//!
//! Question-answering flow.
//!
//! [`Assistant`] ties the pieces together: it reads the API key from a
//! [`SecretStore`], asks the [`McpClient`], records the pair in a
//! [`ConversationStore`], and turns every failure into an [`AppError`].

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app_error::AppError;
use crate::client::{classify, McpClient};
use crate::config::ClientConfig;
use crate::resilience::RetryError;
use crate::storage::{ConversationItem, ConversationStore, SecretStore};
use crate::{Error, ErrorContext};

/// Shown in place of a stored key.
pub const API_KEY_MASK: &str = "••••••••••••••••";

const MSG_KEY_EMPTY: &str = "API Keyを入力してください";
const MSG_KEY_MASKED: &str = "新しいAPI Keyを入力してください";
const MSG_CANCELLED: &str = "リクエストがキャンセルされました。";

/// Whether a key is stored, and how to display it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyStatus {
    pub has_key: bool,
    pub masked: String,
}

pub struct Assistant<S, H> {
    config: ClientConfig,
    secrets: S,
    history: H,
}

impl<S, H> Assistant<S, H>
where
    S: SecretStore,
    H: ConversationStore,
{
    pub fn new(config: ClientConfig, secrets: S, history: H) -> Self {
        Self {
            config,
            secrets,
            history,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn secrets(&self) -> &S {
        &self.secrets
    }

    pub fn history_store(&self) -> &H {
        &self.history
    }

    /// Answer one question.
    ///
    /// A missing key fails with an `ApiKey` error before any request is made.
    /// The client built for this call is closed on every path.
    pub async fn answer_question(&self, question: &str) -> Result<String, AppError> {
        self.answer(question, None).await
    }

    /// [`Assistant::answer_question`] that gives up when `cancel` fires.
    pub async fn answer_question_with_cancel(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AppError> {
        self.answer(question, Some(cancel)).await
    }

    async fn answer(
        &self,
        question: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, AppError> {
        let api_key = match self.secrets.get_secret().await {
            Ok(Some(key)) if !key.trim().is_empty() => key,
            Ok(_) => {
                warn!("no api key stored");
                return Err(AppError::api_key_missing());
            }
            Err(e) => return Err(classify_logged(&e)),
        };

        let client =
            McpClient::new(self.config.clone(), api_key).map_err(|e| classify_logged(&e))?;
        let result = match cancel {
            None => client.send(question).await.map_err(|e| classify_logged(&e)),
            Some(token) => client
                .send_with_cancel(question, token)
                .await
                .map_err(|e| match e {
                    RetryError::Failed(e) => classify_logged(&e),
                    RetryError::Cancelled => {
                        info!("question cancelled");
                        AppError::unknown(MSG_CANCELLED)
                    }
                }),
        };
        client.close();
        result
    }

    /// Trim, answer and record `question`.
    ///
    /// A blank question is ignored: `Ok(None)` and nothing is sent.
    pub async fn ask(&self, question: &str) -> Result<Option<ConversationItem>, AppError> {
        self.ask_inner(question, None).await
    }

    pub async fn ask_with_cancel(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ConversationItem>, AppError> {
        self.ask_inner(question, Some(cancel)).await
    }

    async fn ask_inner(
        &self,
        question: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<ConversationItem>, AppError> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(None);
        }

        let answer = self.answer(question, cancel).await?;
        info!(answer_len = answer.len(), "answer received");

        let id = self
            .history
            .append(question, &answer)
            .await
            .map_err(|e| classify_logged(&e))?;
        let item = self
            .history
            .get(&id)
            .await
            .map_err(|e| classify_logged(&e))?
            .ok_or_else(|| {
                classify_logged(&Error::storage_with_context(
                    "stored record not found",
                    ErrorContext::new()
                        .with_details(format!("id {}", id))
                        .with_source("assistant"),
                ))
            })?;
        Ok(Some(item))
    }

    pub async fn history(&self, favorites_only: bool) -> Result<Vec<ConversationItem>, AppError> {
        let items = if favorites_only {
            self.history.list_favorites().await
        } else {
            self.history.list().await
        };
        items.map_err(|e| classify_logged(&e))
    }

    pub async fn set_favorite(&self, id: &str, favorite: bool) -> Result<(), AppError> {
        self.history
            .set_favorite(id, favorite)
            .await
            .map_err(|e| classify_logged(&e))
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.history.delete(id).await.map_err(|e| classify_logged(&e))
    }

    pub async fn delete_all(&self) -> Result<(), AppError> {
        self.history.delete_all().await.map_err(|e| classify_logged(&e))
    }

    /// Store a new API key.
    ///
    /// Rejects an empty key and the display mask itself.
    pub async fn save_api_key(&self, key: &str) -> Result<(), AppError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::api_key(MSG_KEY_EMPTY));
        }
        if key == API_KEY_MASK {
            return Err(AppError::api_key(MSG_KEY_MASKED));
        }
        self.secrets.set_secret(key).await.map_err(|e| {
            AppError::unknown(format!("API Keyの保存に失敗しました: {}", e))
        })
    }

    pub async fn clear_api_key(&self) -> Result<(), AppError> {
        self.secrets.clear_secret().await.map_err(|e| {
            AppError::unknown(format!("API Keyの削除に失敗しました: {}", e))
        })
    }

    pub async fn api_key_status(&self) -> Result<ApiKeyStatus, AppError> {
        let has_key = self.secrets.has_secret().await.map_err(|e| {
            AppError::unknown(format!("API Keyの取得に失敗しました: {}", e))
        })?;
        Ok(ApiKeyStatus {
            has_key,
            masked: if has_key {
                API_KEY_MASK.to_string()
            } else {
                String::new()
            },
        })
    }
}

fn classify_logged(err: &Error) -> AppError {
    let app = classify(err);
    warn!(kind = app.kind().name(), error = %err, "request failed");
    app
}
