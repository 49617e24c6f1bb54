//! In-memory [`ChatHistoryStore`].
//!
//! Each key holds a `VecDeque` in newest-first order, the same shape a list
//! maintained with `LPUSH` + `LTRIM` has. Trimming happens on every append so
//! memory stays bounded no matter how often history is read.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ChatEntry, ChatHistoryStore, HistoryError};

#[derive(Default)]
pub struct InMemoryChatHistoryStore {
    lists: Mutex<HashMap<String, VecDeque<ChatEntry>>>,
}

impl InMemoryChatHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries physically stored under `key`.
    pub async fn stored_len(&self, key: &str) -> usize {
        self.lists
            .lock()
            .await
            .get(key)
            .map(VecDeque::len)
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatHistoryStore for InMemoryChatHistoryStore {
    async fn append(&self, key: &str, entry: ChatEntry, cap: usize) -> Result<(), HistoryError> {
        let mut lists = self.lists.lock().await;
        let list = lists.entry(key.to_string()).or_default();
        list.push_front(entry);
        list.truncate(cap);
        if list.is_empty() {
            lists.remove(key);
        }
        Ok(())
    }

    async fn recent(&self, key: &str, limit: usize) -> Result<Vec<ChatEntry>, HistoryError> {
        let lists = self.lists.lock().await;
        Ok(lists
            .get(key)
            .map(|list| list.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
