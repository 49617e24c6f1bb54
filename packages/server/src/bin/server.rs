//! Collaboration gateway server.
//!
//! Run with:
//! ```not_rust
//! COLLAB_JWT_SECRET=... cargo run --bin collab-gateway
//! cargo run --bin collab-gateway -- --host 0.0.0.0 --port 3000 --jwt-secret ...
//! ```

use std::sync::Arc;

use clap::Parser;
use collab_gateway::{
    config::GatewayConfig,
    domain::SessionRegistry,
    infrastructure::{
        auth::JwtTokenVerifier, bus::InMemoryPresenceBus,
        message_pusher::WebSocketMessagePusher, repository::InMemoryChatHistoryStore,
    },
    ui::Server,
    usecase::{
        ConnectCollaboratorUseCase, DisconnectCollaboratorUseCase, GetChatHistoryUseCase,
        GetCollaboratorsUseCase, PresenceMirror, RelayMessageUseCase,
    },
};
use collab_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[tokio::main]
async fn main() {
    let config = GatewayConfig::parse();

    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    // Initialize dependencies in order:
    // 1. Session registry
    // 2. Adapters (pusher, verifier, bus, history store)
    // 3. Presence mirror worker
    // 4. UseCases
    // 5. Server

    // 1. Process-wide registry of live document sessions
    let registry = Arc::new(SessionRegistry::new());

    // 2. Adapters
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let message_pusher = Arc::new(WebSocketMessagePusher::new(registry.clone()));
    let token_verifier = match JwtTokenVerifier::new(&config.jwt_secret, clock.clone()) {
        Ok(verifier) => Arc::new(verifier),
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let presence_bus = Arc::new(InMemoryPresenceBus::new());
    let history_store = Arc::new(InMemoryChatHistoryStore::new());

    // 3. Presence mirror worker
    let (presence_mirror, _mirror_worker) =
        PresenceMirror::spawn(presence_bus, config.presence_publish_attempts);
    let presence_mirror = Arc::new(presence_mirror);

    // 4. UseCases
    let connect_collaborator_usecase = Arc::new(ConnectCollaboratorUseCase::new(
        token_verifier,
        registry.clone(),
        message_pusher.clone(),
        presence_mirror.clone(),
    ));
    let relay_message_usecase = Arc::new(RelayMessageUseCase::new(
        registry.clone(),
        message_pusher.clone(),
        history_store.clone(),
        clock,
        config.chat_history_limit,
    ));
    let disconnect_collaborator_usecase = Arc::new(DisconnectCollaboratorUseCase::new(
        registry.clone(),
        message_pusher,
        presence_mirror,
    ));
    let get_chat_history_usecase = Arc::new(GetChatHistoryUseCase::new(
        history_store,
        config.chat_history_limit,
    ));
    let get_collaborators_usecase = Arc::new(GetCollaboratorsUseCase::new(registry));

    // 5. Create and run the server
    let server = Server::new(
        connect_collaborator_usecase,
        relay_message_usecase,
        disconnect_collaborator_usecase,
        get_chat_history_usecase,
        get_collaborators_usecase,
        config.idle_timeout(),
    );
    if let Err(e) = server.run(&config.bind_addr()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
