//! WebSocket message DTOs.
//!
//! Every frame is a JSON object discriminated by `tipo`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Cursor;

/// Collaborator as seen by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorDto {
    pub user_id: String,
    pub nome: String,
    pub cor: String,
    pub cursor: Option<Cursor>,
}

/// Inbound frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tipo", rename_all = "snake_case")]
pub enum ClientMessage {
    CursorMove { cursor: Cursor },
    /// Opaque edit operation, relayed without inspection.
    Edicao { operacao: Value },
    Chat { texto: String },
    Ping,
}

/// Outbound frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tipo", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once, to the newly joined connection only.
    EstadoInicial {
        seu_id: String,
        colaboradores: Vec<CollaboratorDto>,
    },
    UsuarioEntrou {
        usuario: CollaboratorDto,
        colaboradores: Vec<CollaboratorDto>,
    },
    UsuarioSaiu {
        user_id: String,
        colaboradores: Vec<CollaboratorDto>,
    },
    CursorAtualizado {
        user_id: String,
        cursor: Cursor,
    },
    Edicao {
        user_id: String,
        operacao: Value,
    },
    Chat {
        user_id: String,
        nome: String,
        texto: String,
        /// RFC 3339, UTC
        timestamp: String,
    },
    Pong,
}

impl ServerMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
