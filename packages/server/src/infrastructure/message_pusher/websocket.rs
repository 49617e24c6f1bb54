//! Broadcast Router over WebSocket connections.
//!
//! Socket creation lives in the UI layer (`ui/handler/websocket.rs`), which
//! registers each connection's outbound `UnboundedSender` in the registry.
//! This type resolves recipients through the registry and writes to those
//! senders; the per-connection writer task does the actual socket I/O.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{DocumentId, MessagePushError, MessagePusher, SessionRegistry, UserId};

pub struct WebSocketMessagePusher {
    registry: Arc<SessionRegistry>,
}

impl WebSocketMessagePusher {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn push_to(
        &self,
        document_id: &DocumentId,
        user_id: &UserId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let connection = self
            .registry
            .connection(document_id, user_id)
            .await
            .ok_or_else(|| MessagePushError::ConnectionNotFound(user_id.as_str().to_string()))?;

        connection.send(user_id, content.to_string())?;
        tracing::debug!("Pushed message to '{}' on '{}'", user_id, document_id);
        Ok(())
    }

    async fn broadcast(
        &self,
        document_id: &DocumentId,
        content: &str,
        exclude: Option<&UserId>,
    ) -> usize {
        let Some(targets) = self.registry.connections_except(document_id, exclude).await else {
            tracing::debug!("No session for '{}', nothing to broadcast", document_id);
            return 0;
        };

        let mut delivered = 0;
        for (user_id, connection) in targets {
            if !connection.is_writable() {
                tracing::debug!("Skipping non-writable connection of '{}'", user_id);
                continue;
            }
            // Broadcast tolerates individual delivery failures
            match connection.send(&user_id, content.to_string()) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!("Failed to push message to '{}': {}", user_id, e),
            }
        }
        tracing::debug!(
            "Broadcasted message on '{}' to {} connection(s)",
            document_id,
            delivered
        );
        delivered
    }
}
