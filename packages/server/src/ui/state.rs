//! Shared application state handed to every handler.

use std::{sync::Arc, time::Duration};

use crate::usecase::{
    ConnectCollaboratorUseCase, DisconnectCollaboratorUseCase, GetChatHistoryUseCase,
    GetCollaboratorsUseCase, RelayMessageUseCase,
};

pub struct AppState {
    pub connect_collaborator_usecase: Arc<ConnectCollaboratorUseCase>,
    pub relay_message_usecase: Arc<RelayMessageUseCase>,
    pub disconnect_collaborator_usecase: Arc<DisconnectCollaboratorUseCase>,
    pub get_chat_history_usecase: Arc<GetChatHistoryUseCase>,
    pub get_collaborators_usecase: Arc<GetCollaboratorsUseCase>,
    /// Connections silent for longer than this are closed
    pub idle_timeout: Duration,
}
