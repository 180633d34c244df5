//! API key management through the assistant.

use async_trait::async_trait;
use mcp_assistant::assistant::API_KEY_MASK;
use mcp_assistant::storage::{
    ConversationStore, MemoryConversationStore, MemorySecretStore, SecretStore,
};
use mcp_assistant::{AppErrorKind, Assistant, ClientConfig, Error, ErrorContext};
use tokio_test::{assert_err, assert_ok};

/// Secret store whose backend is unavailable.
struct BrokenSecretStore;

fn broken() -> Error {
    Error::storage_with_context(
        "keyring unavailable",
        ErrorContext::new().with_source("broken_secret_store"),
    )
}

#[async_trait]
impl SecretStore for BrokenSecretStore {
    async fn get_secret(&self) -> mcp_assistant::Result<Option<String>> {
        Err(broken())
    }

    async fn set_secret(&self, _secret: &str) -> mcp_assistant::Result<()> {
        Err(broken())
    }

    async fn clear_secret(&self) -> mcp_assistant::Result<()> {
        Err(broken())
    }
}

fn assistant() -> Assistant<MemorySecretStore, MemoryConversationStore> {
    Assistant::new(
        ClientConfig::default(),
        MemorySecretStore::new(),
        MemoryConversationStore::new(),
    )
}

#[tokio::test]
async fn empty_key_is_rejected() {
    let assistant = assistant();
    let err = assistant.save_api_key("   ").await.unwrap_err();
    assert_eq!(err.kind(), AppErrorKind::ApiKey);
    assert_eq!(err.user_message(), "API Keyを入力してください");
    assert!(!assistant.api_key_status().await.unwrap().has_key);
}

#[tokio::test]
async fn mask_is_not_saved_as_a_key() {
    let assistant = assistant();
    let err = assistant.save_api_key(API_KEY_MASK).await.unwrap_err();
    assert_eq!(err.kind(), AppErrorKind::ApiKey);
    assert_eq!(err.user_message(), "新しいAPI Keyを入力してください");
}

#[tokio::test]
async fn save_status_and_clear() {
    let assistant = assistant();

    let status = assistant.api_key_status().await.unwrap();
    assert!(!status.has_key);
    assert_eq!(status.masked, "");

    assistant.save_api_key("  sk-ant-123  ").await.unwrap();
    assert_eq!(
        assistant.secrets().get_secret().await.unwrap().as_deref(),
        Some("sk-ant-123")
    );
    let status = assistant.api_key_status().await.unwrap();
    assert!(status.has_key);
    assert_eq!(status.masked, API_KEY_MASK);

    assert_ok!(assistant.clear_api_key().await);
    assert_ok!(assistant.clear_api_key().await);
    assert!(!assistant.api_key_status().await.unwrap().has_key);
}

#[tokio::test]
async fn store_failures_become_unknown_errors() {
    let assistant = Assistant::new(
        ClientConfig::default(),
        BrokenSecretStore,
        MemoryConversationStore::new(),
    );

    let err = assistant.save_api_key("sk-ant-123").await.unwrap_err();
    assert_eq!(err.kind(), AppErrorKind::Unknown);
    assert!(err.user_message().starts_with("API Keyの保存に失敗しました: "));

    let err = assistant.answer_question("q").await.unwrap_err();
    assert_eq!(err.kind(), AppErrorKind::Unknown);
    assert!(err.user_message().contains("keyring unavailable"));

    assert_err!(assistant.api_key_status().await);
    assert_err!(assistant.clear_api_key().await);
}

#[tokio::test]
async fn favorites_through_the_assistant() {
    let assistant = assistant();
    let store = assistant.history_store();
    let id = store.append("q", "a").await.unwrap();

    assistant.set_favorite(&id, true).await.unwrap();
    assert_eq!(assistant.history(true).await.unwrap().len(), 1);

    assistant.set_favorite(&id, false).await.unwrap();
    assert!(assistant.history(true).await.unwrap().is_empty());

    assistant.delete(&id).await.unwrap();
    assert!(assistant.history(false).await.unwrap().is_empty());
}
