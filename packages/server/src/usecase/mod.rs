//! UseCase layer: one type per gateway operation.

mod connect_collaborator;
mod disconnect_collaborator;
mod error;
mod get_chat_history;
mod get_collaborators;
mod mirror_presence;
mod relay_message;

pub use connect_collaborator::ConnectCollaboratorUseCase;
pub use disconnect_collaborator::DisconnectCollaboratorUseCase;
pub use error::{ConnectError, HistoryQueryError, RelayError};
pub use get_chat_history::GetChatHistoryUseCase;
pub use get_collaborators::GetCollaboratorsUseCase;
pub use mirror_presence::PresenceMirror;
pub use relay_message::{RelayMessageUseCase, RelayOutcome};
