//! UseCase: tearing down a collaborator's participation.
//!
//! Drives `-> Closed`. Only the `Active -> Closed` edge deregisters,
//! announces the exit and mirrors it, so repeated close/error notifications
//! for one socket clean up once.
//!
//! ## テスト実装の作業記録
//!
//! ### どのような状況を想定しているか
//! - 正常系：退出の通知、最後の参加者の退出
//! - エッジケース：close と error の二重通知、置き換え済みの接続、Active 前の切断

use std::sync::Arc;

use crate::{
    domain::{
        CollaborationSession, Collaborator, MessagePusher, PresenceEvent, SessionEffect,
        SessionEvent, SessionRegistry,
    },
    infrastructure::dto::{conversion::roster_to_dto, websocket::ServerMessage},
};

use super::mirror_presence::PresenceMirror;

pub struct DisconnectCollaboratorUseCase {
    registry: Arc<SessionRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    presence_mirror: Arc<PresenceMirror>,
}

impl DisconnectCollaboratorUseCase {
    pub fn new(
        registry: Arc<SessionRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        presence_mirror: Arc<PresenceMirror>,
    ) -> Self {
        Self {
            registry,
            message_pusher,
            presence_mirror,
        }
    }

    /// Close `session` and clean up after it.
    ///
    /// # Returns
    ///
    /// The removed collaborator, or `None` when there was nothing to clean up:
    /// the session never became active, was already closed, or its
    /// registration had been taken over by a newer connection of the same user.
    pub async fn execute(&self, session: &mut CollaborationSession) -> Option<Collaborator> {
        let collaborator = match session.apply(SessionEvent::Terminated) {
            Ok(SessionEffect::Cleanup(collaborator)) => collaborator,
            Ok(_) => return None,
            Err(e) => {
                tracing::error!("Unexpected close transition: {}", e);
                return None;
            }
        };
        let document_id = session.document_id();

        let Some(removed) = self
            .registry
            .deregister_connection(document_id, &collaborator.user_id, session.connection_id())
            .await
        else {
            tracing::info!(
                "Connection {} of '{}' was replaced, skipping exit announcement",
                session.connection_id(),
                collaborator.user_id
            );
            return None;
        };
        tracing::info!("'{}' left '{}'", removed.user_id, document_id);

        // The leaving connection is already gone, so nobody is excluded
        let roster = roster_to_dto(self.registry.snapshot(document_id).await);
        match (ServerMessage::UsuarioSaiu {
            user_id: removed.user_id.as_str().to_string(),
            colaboradores: roster,
        })
        .to_json()
        {
            Ok(json) => {
                self.message_pusher.broadcast(document_id, &json, None).await;
            }
            Err(e) => tracing::error!("Failed to encode usuario_saiu: {}", e),
        }

        self.presence_mirror
            .mirror(PresenceEvent::left(document_id.clone(), removed.clone()));

        Some(removed)
    }
}
