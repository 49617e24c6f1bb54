//! HTTP API DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::CollaboratorDto;

/// One stored chat line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntryDto {
    pub user_id: String,
    pub nome: String,
    pub texto: String,
    /// RFC 3339, UTC
    pub timestamp: String,
}

/// Response of `GET /api/documents/{id}/chat`, oldest entry first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistoryDto {
    pub document_id: String,
    pub mensagens: Vec<ChatEntryDto>,
}

/// Response of `GET /api/documents/{id}/collaborators`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorsDto {
    pub document_id: String,
    pub colaboradores: Vec<CollaboratorDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
    pub active_sessions: usize,
}

/// Query of the chat history endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatHistoryQuery {
    pub limit: Option<usize>,
}
