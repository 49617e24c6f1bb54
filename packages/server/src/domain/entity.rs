//! Entities of the collaboration domain.

use serde::Serialize;
use uuid::Uuid;

use super::value_object::{ChatText, Color, Cursor, DocumentId, UserId};

/// Identity yielded by a verified credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub display_name: String,
}

impl Identity {
    pub fn new(user_id: UserId, display_name: String) -> Self {
        Self {
            user_id,
            display_name,
        }
    }
}

/// Presence record for one user within one document session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collaborator {
    pub user_id: UserId,
    pub display_name: String,
    pub color: Color,
    pub cursor: Option<Cursor>,
}

impl Collaborator {
    pub fn new(identity: Identity, color: Color) -> Self {
        Self {
            user_id: identity.user_id,
            display_name: identity.display_name,
            color,
            cursor: None,
        }
    }
}

/// One chat line as kept in the bounded history store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub sender_id: UserId,
    pub sender_name: String,
    pub text: ChatText,
    /// Unix timestamp in milliseconds (UTC)
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceKind {
    Entered,
    Left,
}

/// Cross-instance notification that a user entered or left a document session.
///
/// `event_id` is fixed when the event is created and reused on every publish
/// attempt, so subscribers can drop duplicates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresenceEvent {
    pub event_id: Uuid,
    pub document_id: DocumentId,
    pub kind: PresenceKind,
    pub user_id: UserId,
    pub collaborator: Option<Collaborator>,
}

impl PresenceEvent {
    pub fn entered(document_id: DocumentId, collaborator: Collaborator) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            document_id,
            kind: PresenceKind::Entered,
            user_id: collaborator.user_id.clone(),
            collaborator: Some(collaborator),
        }
    }

    pub fn left(document_id: DocumentId, collaborator: Collaborator) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            document_id,
            kind: PresenceKind::Left,
            user_id: collaborator.user_id.clone(),
            collaborator: Some(collaborator),
        }
    }

    pub fn topic(&self) -> String {
        self.document_id.presence_topic()
    }
}
