//! Collaboration Session: per-connection state machine.
//!
//! ```text
//! Connecting --Verified--> Active --Terminated--> Closed
//!     |                                             ^
//!     +-----------VerificationFailed----------------+
//! ```
//!
//! Cleanup is emitted only by the `Active -> Closed` edge, so a socket that
//! reports both a close and a later error is cleaned up once, and a rejected
//! connection never touches the registry.

use super::{
    entity::Collaborator,
    error::SessionStateError,
    value_object::{ConnectionId, DocumentId, UserId},
};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Connecting,
    Active { collaborator: Collaborator },
    Closed,
}

/// Inputs driving the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Credential verified and the collaborator registered.
    Verified(Collaborator),
    VerificationFailed,
    /// Remote close, transport error or idle timeout.
    Terminated,
}

/// What the caller must do after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// Announce entry, send the initial state, mirror presence.
    Join(Collaborator),
    /// Close the transport with the authentication failure code.
    Reject,
    /// Deregister, announce exit, mirror presence.
    Cleanup(Collaborator),
    Nothing,
}

#[derive(Debug)]
pub struct CollaborationSession {
    document_id: DocumentId,
    connection_id: ConnectionId,
    state: SessionState,
}

impl CollaborationSession {
    pub fn new(document_id: DocumentId) -> Self {
        Self {
            document_id,
            connection_id: ConnectionId::generate(),
            state: SessionState::Connecting,
        }
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed)
    }

    /// User id of the active collaborator.
    pub fn user_id(&self) -> Result<&UserId, SessionStateError> {
        match &self.state {
            SessionState::Active { collaborator } => Ok(&collaborator.user_id),
            SessionState::Connecting => Err(SessionStateError::NotActive),
            SessionState::Closed => Err(SessionStateError::Closed),
        }
    }

    /// Display name of the active collaborator.
    pub fn display_name(&self) -> Result<&str, SessionStateError> {
        match &self.state {
            SessionState::Active { collaborator } => Ok(&collaborator.display_name),
            SessionState::Connecting => Err(SessionStateError::NotActive),
            SessionState::Closed => Err(SessionStateError::Closed),
        }
    }

    /// Apply `event` and report the side effect the caller owes.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionEffect, SessionStateError> {
        let current = std::mem::replace(&mut self.state, SessionState::Closed);
        let (next, effect) = match (current, event) {
            (SessionState::Connecting, SessionEvent::Verified(collaborator)) => (
                SessionState::Active {
                    collaborator: collaborator.clone(),
                },
                Ok(SessionEffect::Join(collaborator)),
            ),
            (SessionState::Connecting, SessionEvent::VerificationFailed) => {
                (SessionState::Closed, Ok(SessionEffect::Reject))
            }
            (SessionState::Connecting, SessionEvent::Terminated) => {
                (SessionState::Closed, Ok(SessionEffect::Nothing))
            }
            (SessionState::Active { collaborator }, SessionEvent::Terminated) => {
                (SessionState::Closed, Ok(SessionEffect::Cleanup(collaborator)))
            }
            (state @ SessionState::Active { .. }, _) => {
                (state, Err(SessionStateError::AlreadyActive))
            }
            (SessionState::Closed, SessionEvent::Terminated) => {
                (SessionState::Closed, Ok(SessionEffect::Nothing))
            }
            (SessionState::Closed, _) => (SessionState::Closed, Err(SessionStateError::Closed)),
        };
        self.state = next;
        effect
    }
}
