//! UseCase: dispatching one inbound frame of an active collaborator.
//!
//! | `tipo`        | effect                                                  |
//! |---------------|---------------------------------------------------------|
//! | `cursor_move` | store cursor, broadcast `cursor_atualizado` (not to self) |
//! | `edicao`      | broadcast `edicao` as received (not to self)            |
//! | `chat`        | broadcast `chat` to everyone, append to history         |
//! | `ping`        | reply `pong` to the sender only                         |
//!
//! Chat is echoed to its sender while cursor and edit traffic is not; clients
//! render their own chat line from the echo.

use std::sync::Arc;

use collab_shared::time::Clock;

use crate::{
    domain::{
        ChatEntry, ChatHistoryStore, ChatText, CollaborationSession, MessagePusher,
        SessionRegistry,
    },
    infrastructure::dto::websocket::{ClientMessage, ServerMessage},
};

use super::error::RelayError;

/// What a dispatched frame resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Broadcast reached this many connections.
    Broadcast(usize),
    /// Reply sent to the sender only.
    Replied,
    /// Dropped because the sender is no longer registered.
    Ignored,
}

pub struct RelayMessageUseCase {
    registry: Arc<SessionRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    history_store: Arc<dyn ChatHistoryStore>,
    clock: Arc<dyn Clock>,
    history_limit: usize,
}

impl RelayMessageUseCase {
    pub fn new(
        registry: Arc<SessionRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        history_store: Arc<dyn ChatHistoryStore>,
        clock: Arc<dyn Clock>,
        history_limit: usize,
    ) -> Self {
        Self {
            registry,
            message_pusher,
            history_store,
            clock,
            history_limit,
        }
    }

    /// Parse and dispatch one text frame.
    pub async fn execute(
        &self,
        session: &CollaborationSession,
        text: &str,
    ) -> Result<RelayOutcome, RelayError> {
        let message = serde_json::from_str::<ClientMessage>(text)
            .map_err(|e| RelayError::Malformed(e.to_string()))?;
        self.dispatch(session, message).await
    }

    async fn dispatch(
        &self,
        session: &CollaborationSession,
        message: ClientMessage,
    ) -> Result<RelayOutcome, RelayError> {
        let document_id = session.document_id();
        let user_id = session.user_id()?;

        match message {
            ClientMessage::CursorMove { cursor } => {
                if !self
                    .registry
                    .update_cursor(document_id, user_id, cursor)
                    .await
                {
                    tracing::debug!("Cursor from unregistered '{}' ignored", user_id);
                    return Ok(RelayOutcome::Ignored);
                }
                let json = ServerMessage::CursorAtualizado {
                    user_id: user_id.as_str().to_string(),
                    cursor,
                }
                .to_json()?;
                let delivered = self
                    .message_pusher
                    .broadcast(document_id, &json, Some(user_id))
                    .await;
                Ok(RelayOutcome::Broadcast(delivered))
            }
            ClientMessage::Edicao { operacao } => {
                let json = ServerMessage::Edicao {
                    user_id: user_id.as_str().to_string(),
                    operacao,
                }
                .to_json()?;
                let delivered = self
                    .message_pusher
                    .broadcast(document_id, &json, Some(user_id))
                    .await;
                Ok(RelayOutcome::Broadcast(delivered))
            }
            ClientMessage::Chat { texto } => {
                let entry = ChatEntry {
                    sender_id: user_id.clone(),
                    sender_name: session.display_name()?.to_string(),
                    text: ChatText::new(texto)?,
                    timestamp: self.clock.now_millis(),
                };
                let json = ServerMessage::from(entry.clone()).to_json()?;
                let delivered = self.message_pusher.broadcast(document_id, &json, None).await;

                // Persistence is best-effort and never undoes the broadcast
                if let Err(e) = self
                    .history_store
                    .append(&document_id.chat_history_key(), entry, self.history_limit)
                    .await
                {
                    tracing::warn!("Failed to store chat for '{}': {}", document_id, e);
                }
                Ok(RelayOutcome::Broadcast(delivered))
            }
            ClientMessage::Ping => {
                let json = ServerMessage::Pong.to_json()?;
                if let Err(e) = self
                    .message_pusher
                    .push_to(document_id, user_id, &json)
                    .await
                {
                    tracing::debug!("Pong to '{}' not delivered: {}", user_id, e);
                    return Ok(RelayOutcome::Ignored);
                }
                Ok(RelayOutcome::Replied)
            }
        }
    }
}
