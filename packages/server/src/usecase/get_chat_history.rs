//! UseCase: chat history for late joiners.

use std::sync::Arc;

use crate::domain::{ChatEntry, ChatHistoryStore, DocumentId};

use super::error::HistoryQueryError;

pub struct GetChatHistoryUseCase {
    history_store: Arc<dyn ChatHistoryStore>,
    history_limit: usize,
}

impl GetChatHistoryUseCase {
    pub fn new(history_store: Arc<dyn ChatHistoryStore>, history_limit: usize) -> Self {
        Self {
            history_store,
            history_limit,
        }
    }

    /// Up to `limit` (capped at the retention limit) most recent entries,
    /// oldest first.
    pub async fn execute(
        &self,
        document_id: &DocumentId,
        limit: Option<usize>,
    ) -> Result<Vec<ChatEntry>, HistoryQueryError> {
        let limit = limit.unwrap_or(self.history_limit).min(self.history_limit);
        let mut entries = self
            .history_store
            .recent(&document_id.chat_history_key(), limit)
            .await?;
        // The store is newest-first
        entries.reverse();
        Ok(entries)
    }
}
