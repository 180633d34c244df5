//! Conversation history.
//!
//! Records are listed newest first. Favorite and delete operations on an id
//! that does not exist are no-ops.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Error, ErrorContext, Result};

/// One stored question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationItem {
    pub id: String,
    pub question: String,
    pub answer: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub is_favorite: bool,
}

impl ConversationItem {
    fn new(question: &str, answer: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: now_millis(),
            is_favorite: false,
        }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Store a new pair and return its id.
    async fn append(&self, question: &str, answer: &str) -> Result<String>;

    async fn get(&self, id: &str) -> Result<Option<ConversationItem>>;

    /// All records, newest first.
    async fn list(&self) -> Result<Vec<ConversationItem>>;

    /// Favorite records, newest first.
    async fn list_favorites(&self) -> Result<Vec<ConversationItem>> {
        let mut items = self.list().await?;
        items.retain(|c| c.is_favorite);
        Ok(items)
    }

    async fn set_favorite(&self, id: &str, favorite: bool) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn delete_all(&self) -> Result<()>;
}

/// Insertion-ordered records shared by both adapters.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
struct Conversations(Vec<ConversationItem>);

impl Conversations {
    fn append(&mut self, question: &str, answer: &str) -> String {
        let item = ConversationItem::new(question, answer);
        let id = item.id.clone();
        self.0.push(item);
        id
    }

    fn get(&self, id: &str) -> Option<ConversationItem> {
        self.0.iter().find(|c| c.id == id).cloned()
    }

    fn newest_first(&self) -> Vec<ConversationItem> {
        let mut items: Vec<_> = self.0.iter().rev().cloned().collect();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        items
    }

    /// Returns whether anything changed.
    fn set_favorite(&mut self, id: &str, favorite: bool) -> bool {
        match self.0.iter_mut().find(|c| c.id == id) {
            Some(item) if item.is_favorite != favorite => {
                item.is_favorite = favorite;
                true
            }
            _ => false,
        }
    }

    fn delete(&mut self, id: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|c| c.id != id);
        self.0.len() != before
    }

    fn delete_all(&mut self) -> bool {
        let changed = !self.0.is_empty();
        self.0.clear();
        changed
    }
}

/// History held in memory only.
#[derive(Debug, Default)]
pub struct MemoryConversationStore {
    inner: RwLock<Conversations>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn append(&self, question: &str, answer: &str) -> Result<String> {
        Ok(self.inner.write().await.append(question, answer))
    }

    async fn get(&self, id: &str) -> Result<Option<ConversationItem>> {
        Ok(self.inner.read().await.get(id))
    }

    async fn list(&self) -> Result<Vec<ConversationItem>> {
        Ok(self.inner.read().await.newest_first())
    }

    async fn set_favorite(&self, id: &str, favorite: bool) -> Result<()> {
        self.inner.write().await.set_favorite(id, favorite);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.inner.write().await.delete(id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.inner.write().await.delete_all();
        Ok(())
    }
}

/// History persisted as a single JSON array.
///
/// The whole file is rewritten after each change, through a temporary file
/// renamed over the original. A missing file is an empty history.
#[derive(Debug)]
pub struct JsonFileConversationStore {
    path: PathBuf,
    inner: Mutex<Conversations>,
}

impl JsonFileConversationStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conversations = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(|b| b.is_ascii_whitespace()) => Conversations::default(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::storage_with_context(
                    "history file is not valid JSON",
                    ErrorContext::new()
                        .with_field_path(path.display().to_string())
                        .with_details(e.to_string())
                        .with_source("json_history_store"),
                )
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Conversations::default(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), records = conversations.0.len(), "history loaded");
        Ok(Self {
            path,
            inner: Mutex::new(conversations),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, conversations: &Conversations) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(conversations)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), records = conversations.0.len(), "history saved");
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for JsonFileConversationStore {
    async fn append(&self, question: &str, answer: &str) -> Result<String> {
        let mut inner = self.inner.lock().await;
        let mut next = inner.clone();
        let id = next.append(question, answer);
        self.persist(&next).await?;
        *inner = next;
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<ConversationItem>> {
        Ok(self.inner.lock().await.get(id))
    }

    async fn list(&self) -> Result<Vec<ConversationItem>> {
        Ok(self.inner.lock().await.newest_first())
    }

    async fn set_favorite(&self, id: &str, favorite: bool) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let mut next = inner.clone();
        if next.set_favorite(id, favorite) {
            self.persist(&next).await?;
            *inner = next;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let mut next = inner.clone();
        if next.delete(id) {
            self.persist(&next).await?;
            *inner = next;
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let mut next = inner.clone();
        if next.delete_all() {
            self.persist(&next).await?;
            *inner = next;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_lists_newest_first() {
        let store = MemoryConversationStore::new();
        let first = store.append("q1", "a1").await.unwrap();
        let second = store.append("q2", "a2").await.unwrap();

        let ids: Vec<_> = store.list().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second.clone(), first.clone()]);

        store.set_favorite(&first, true).await.unwrap();
        let favs = store.list_favorites().await.unwrap();
        assert_eq!(favs.len(), 1);
        assert_eq!(favs[0].id, first);

        store.delete(&first).await.unwrap();
        store.delete("does-not-exist").await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);

        store.delete_all().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[test]
    fn record_json_uses_snake_case_fields() {
        let item = ConversationItem {
            id: "1".into(),
            question: "q".into(),
            answer: "a".into(),
            timestamp: 42,
            is_favorite: true,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["is_favorite"], true);
        assert_eq!(json["timestamp"], 42);

        let back: ConversationItem =
            serde_json::from_str(r#"{"id":"1","question":"q","answer":"a","timestamp":1}"#).unwrap();
        assert!(!back.is_favorite);
    }
}
