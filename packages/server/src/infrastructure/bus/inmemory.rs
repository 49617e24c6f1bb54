//! In-process [`PresenceBus`] over `tokio::sync::broadcast`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};

use crate::domain::{BusError, PresenceBus, PresenceEvent};

/// Per-topic channel capacity. Lagging subscribers skip events.
const TOPIC_CAPACITY: usize = 256;

#[derive(Default)]
pub struct InMemoryPresenceBus {
    topics: Mutex<HashMap<String, broadcast::Sender<PresenceEvent>>>,
}

impl InMemoryPresenceBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `topic`, creating it if needed.
    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<PresenceEvent> {
        let mut topics = self.topics.lock().await;
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }
}

#[async_trait]
impl PresenceBus for InMemoryPresenceBus {
    async fn publish(&self, topic: &str, event: &PresenceEvent) -> Result<(), BusError> {
        let mut topics = self.topics.lock().await;
        let Some(sender) = topics.get(topic) else {
            tracing::trace!("No subscribers on '{}'", topic);
            return Ok(());
        };

        // send() only fails when every receiver is gone
        if sender.send(event.clone()).is_err() {
            topics.remove(topic);
            tracing::trace!("Dropped topic '{}' without subscribers", topic);
        }
        Ok(())
    }
}
