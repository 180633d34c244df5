//! 本地存储边界：API 密钥与对话历史。
//!
//! # Storage Module
//!
//! Boundary traits for the two things the assistant keeps locally, with
//! ready-made adapters.
//!
//! | Trait | Adapters |
//! |-------|----------|
//! | [`SecretStore`] | [`KeyringSecretStore`] (OS keyring), [`MemorySecretStore`] |
//! | [`ConversationStore`] | [`JsonFileConversationStore`], [`MemoryConversationStore`] |

pub mod history;
pub mod secret;

pub use history::{
    ConversationItem, ConversationStore, JsonFileConversationStore, MemoryConversationStore,
};
pub use secret::{KeyringSecretStore, MemorySecretStore, SecretStore};
