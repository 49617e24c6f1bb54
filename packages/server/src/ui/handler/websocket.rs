//! WebSocket connection handlers.
//!
//! Each upgraded socket owns one [`CollaborationSession`] and walks it
//! through `Connecting -> Active -> Closed`. Outbound frames go through a
//! per-connection channel drained by [`pusher_loop`].

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        Path, Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{CollaborationSession, DocumentId},
    ui::state::AppState,
};

/// Close code sent when the credential is missing or rejected.
pub const AUTH_FAILED_CLOSE_CODE: u16 = 4001;
pub const AUTH_FAILED_REASON: &str = "Token inválido";

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let document_id = match DocumentId::try_from(document_id.clone()) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Invalid document id '{}': {}", document_id, e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, document_id, query.token)))
}

/// Drains the connection's outbound channel into the WebSocket sink.
///
/// The channel closes when the registry drops the handle, e.g. after a
/// reconnect replaced this connection. The socket is closed in that case.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                return;
            }
        }
        if let Err(e) = sender.close().await {
            tracing::debug!("Failed to close socket: {}", e);
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    document_id: DocumentId,
    token: Option<String>,
) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = CollaborationSession::new(document_id);

    // Connecting: verify before anything is registered
    let identity = match state
        .connect_collaborator_usecase
        .authenticate(&mut session, token.as_deref())
        .await
    {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(
                "Rejected connection {} to '{}': {}",
                session.connection_id(),
                session.document_id(),
                e
            );
            let frame = CloseFrame {
                code: AUTH_FAILED_CLOSE_CODE,
                reason: Utf8Bytes::from_static(AUTH_FAILED_REASON),
            };
            if let Err(e) = sender.send(Message::Close(Some(frame))).await {
                tracing::debug!("Failed to send close frame: {}", e);
            }
            return;
        }
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let mut send_task = pusher_loop(rx, sender);

    if let Err(e) = state
        .connect_collaborator_usecase
        .execute(&mut session, identity, tx)
        .await
    {
        tracing::error!(
            "Failed to admit connection {} to '{}': {}",
            session.connection_id(),
            session.document_id(),
            e
        );
        state
            .disconnect_collaborator_usecase
            .execute(&mut session)
            .await;
        send_task.abort();
        return;
    }

    // Active: either side finishing ends the connection
    tokio::select! {
        _ = receive_loop(&mut receiver, &state, &session, state.idle_timeout) => send_task.abort(),
        _ = &mut send_task => {},
    };

    state
        .disconnect_collaborator_usecase
        .execute(&mut session)
        .await;
}

async fn receive_loop(
    receiver: &mut SplitStream<WebSocket>,
    state: &AppState,
    session: &CollaborationSession,
    idle_timeout: Duration,
) {
    loop {
        let next = match tokio::time::timeout(idle_timeout, receiver.next()).await {
            Ok(next) => next,
            Err(_) => {
                tracing::info!(
                    "Connection {} idle for {:?}, closing",
                    session.connection_id(),
                    idle_timeout
                );
                return;
            }
        };

        let msg = match next {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                tracing::warn!("WebSocket error on {}: {}", session.connection_id(), e);
                return;
            }
            None => return,
        };

        match msg {
            Message::Text(text) => {
                match state
                    .relay_message_usecase
                    .execute(session, text.as_str())
                    .await
                {
                    Ok(outcome) => tracing::trace!("Relayed: {:?}", outcome),
                    Err(e) => {
                        tracing::warn!(
                            "Dropped message from connection {}: {}",
                            session.connection_id(),
                            e
                        );
                    }
                }
            }
            Message::Binary(_) => {
                tracing::warn!(
                    "Dropped binary frame from connection {}",
                    session.connection_id()
                );
            }
            Message::Ping(_) | Message::Pong(_) => {
                // Answered by the protocol layer
            }
            Message::Close(_) => {
                tracing::info!("Connection {} requested close", session.connection_id());
                return;
            }
        }
    }
}
