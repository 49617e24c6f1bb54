//! UseCase: admitting a collaborator to a document session.
//!
//! Drives `Connecting -> Active`: verify the credential, register the
//! connection, greet it with the initial state, announce the entry to the
//! session and mirror it on the fan-out bus.
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectCollaboratorUseCase::authenticate() / execute()
//!
//! ### どのような状況を想定しているか
//! - 正常系：最初の参加者、2人目の参加者
//! - 異常系：不正なトークン、トークンなし
//! - エッジケース：同一ユーザーの再接続、参加と並行するブロードキャスト

use std::sync::Arc;

use crate::{
    domain::{
        AuthError, CollaborationSession, Collaborator, ConnectionHandle, Identity, MessagePusher,
        PresenceEvent, PusherChannel, SessionEffect, SessionEvent, SessionRegistry, TokenVerifier,
    },
    infrastructure::dto::{
        conversion::roster_to_dto,
        websocket::{CollaboratorDto, ServerMessage},
    },
};

use super::{error::ConnectError, mirror_presence::PresenceMirror};

pub struct ConnectCollaboratorUseCase {
    token_verifier: Arc<dyn TokenVerifier>,
    registry: Arc<SessionRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    presence_mirror: Arc<PresenceMirror>,
}

impl ConnectCollaboratorUseCase {
    pub fn new(
        token_verifier: Arc<dyn TokenVerifier>,
        registry: Arc<SessionRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        presence_mirror: Arc<PresenceMirror>,
    ) -> Self {
        Self {
            token_verifier,
            registry,
            message_pusher,
            presence_mirror,
        }
    }

    /// Verify the credential carried by the connection.
    ///
    /// On failure the session moves straight to `Closed` and nothing is
    /// registered or broadcast.
    pub async fn authenticate(
        &self,
        session: &mut CollaborationSession,
        token: Option<&str>,
    ) -> Result<Identity, ConnectError> {
        let verified = match token {
            Some(token) => self.token_verifier.verify(token).await,
            None => Err(AuthError::MissingToken),
        };

        match verified {
            Ok(identity) => Ok(identity),
            Err(e) => {
                session.apply(SessionEvent::VerificationFailed)?;
                Err(ConnectError::Unauthorized(e))
            }
        }
    }

    /// Register the verified connection and announce it.
    ///
    /// # Arguments
    ///
    /// * `session` - state machine of this connection, in `Connecting`
    /// * `identity` - identity returned by [`authenticate`](Self::authenticate)
    /// * `sender` - outbound channel drained by the connection's writer
    pub async fn execute(
        &self,
        session: &mut CollaborationSession,
        identity: Identity,
        sender: PusherChannel,
    ) -> Result<Collaborator, ConnectError> {
        let document_id = session.document_id().clone();
        let connection = ConnectionHandle::new(session.connection_id(), sender);

        // 1. Register connection and presence record as a pair. The initial
        //    state is queued under the registry lock, ahead of any broadcast.
        let registration = self
            .registry
            .register_with_greeting(&document_id, identity, connection, |joined, roster| {
                ServerMessage::EstadoInicial {
                    seu_id: joined.user_id.as_str().to_string(),
                    colaboradores: roster_to_dto(roster.to_vec()),
                }
                .to_json()
                .map(Some)
            })
            .await?;
        let collaborator = registration.collaborator;

        // 2. Connecting -> Active
        match session.apply(SessionEvent::Verified(collaborator.clone())) {
            Ok(SessionEffect::Join(_)) => {}
            Ok(effect) => {
                tracing::error!("Unexpected effect on join: {:?}", effect);
            }
            Err(e) => {
                self.registry
                    .deregister_connection(
                        &document_id,
                        &collaborator.user_id,
                        session.connection_id(),
                    )
                    .await;
                return Err(e.into());
            }
        }

        if let Some(replaced) = registration.replaced {
            tracing::info!(
                "'{}' reconnected to '{}', replacing connection {}",
                collaborator.user_id,
                document_id,
                replaced
            );
        } else {
            tracing::info!("'{}' joined '{}'", collaborator.user_id, document_id);
        }

        // 3. Entry announcement to everyone in the session
        let joined = ServerMessage::UsuarioEntrou {
            usuario: CollaboratorDto::from(collaborator.clone()),
            colaboradores: roster_to_dto(registration.roster),
        }
        .to_json()?;
        self.message_pusher
            .broadcast(&document_id, &joined, None)
            .await;

        // 4. Mirror the entry; a reconnect is not a new entry
        if registration.replaced.is_none() {
            self.presence_mirror
                .mirror(PresenceEvent::entered(document_id, collaborator.clone()));
        }

        Ok(collaborator)
    }
}
