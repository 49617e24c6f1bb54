//! Server execution logic.

use std::{sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::usecase::{
    ConnectCollaboratorUseCase, DisconnectCollaboratorUseCase, GetChatHistoryUseCase,
    GetCollaboratorsUseCase, RelayMessageUseCase,
};

use super::{
    handler::{get_chat_history, get_collaborators, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Collaboration gateway server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     connect_collaborator_usecase,
///     relay_message_usecase,
///     disconnect_collaborator_usecase,
///     get_chat_history_usecase,
///     get_collaborators_usecase,
///     Duration::from_secs(120),
/// );
/// server.run("127.0.0.1:8080").await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(
        connect_collaborator_usecase: Arc<ConnectCollaboratorUseCase>,
        relay_message_usecase: Arc<RelayMessageUseCase>,
        disconnect_collaborator_usecase: Arc<DisconnectCollaboratorUseCase>,
        get_chat_history_usecase: Arc<GetChatHistoryUseCase>,
        get_collaborators_usecase: Arc<GetCollaboratorsUseCase>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                connect_collaborator_usecase,
                relay_message_usecase,
                disconnect_collaborator_usecase,
                get_chat_history_usecase,
                get_collaborators_usecase,
                idle_timeout,
            }),
        }
    }

    /// Routes of the gateway, with request tracing.
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket
            .route("/ws/document/{document_id}", get(websocket_handler))
            // HTTP API
            .route("/api/health", get(health_check))
            .route("/api/documents/{document_id}/chat", get(get_chat_history))
            .route(
                "/api/documents/{document_id}/collaborators",
                get(get_collaborators),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind to `bind_addr` and serve until a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or serving fails.
    pub async fn run(self, bind_addr: &str) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;

        tracing::info!(
            "Collaboration gateway listening on {}",
            listener.local_addr()?
        );
        tracing::info!("Connect to: ws://{}/ws/document/{{id}}?token=...", bind_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
