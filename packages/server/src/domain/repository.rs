//! Bounded chat history port.

use async_trait::async_trait;

use super::{entity::ChatEntry, error::HistoryError};

/// Key-ordered list holding the most recent chat entries per key.
///
/// Storage order is newest-first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatHistoryStore: Send + Sync {
    /// Prepend `entry` under `key`, then trim the list to `cap` entries.
    async fn append(&self, key: &str, entry: ChatEntry, cap: usize) -> Result<(), HistoryError>;

    /// Up to `limit` entries under `key`, newest first.
    async fn recent(&self, key: &str, limit: usize) -> Result<Vec<ChatEntry>, HistoryError>;
}
