//! Conversion from domain entities to DTOs.

use collab_shared::time::timestamp_to_rfc3339;

use crate::domain::{ChatEntry, Collaborator};

use super::{
    http::ChatEntryDto,
    websocket::{CollaboratorDto, ServerMessage},
};

impl From<Collaborator> for CollaboratorDto {
    fn from(model: Collaborator) -> Self {
        Self {
            user_id: model.user_id.into_string(),
            nome: model.display_name,
            cor: model.color.as_str().to_string(),
            cursor: model.cursor,
        }
    }
}

impl From<ChatEntry> for ChatEntryDto {
    fn from(model: ChatEntry) -> Self {
        Self {
            user_id: model.sender_id.into_string(),
            nome: model.sender_name,
            texto: model.text.into_string(),
            timestamp: timestamp_to_rfc3339(model.timestamp),
        }
    }
}

impl From<ChatEntry> for ServerMessage {
    fn from(model: ChatEntry) -> Self {
        let dto = ChatEntryDto::from(model);
        ServerMessage::Chat {
            user_id: dto.user_id,
            nome: dto.nome,
            texto: dto.texto,
            timestamp: dto.timestamp,
        }
    }
}

/// Convert a roster into its wire form, keeping order.
pub fn roster_to_dto(roster: Vec<Collaborator>) -> Vec<CollaboratorDto> {
    roster.into_iter().map(CollaboratorDto::from).collect()
}
