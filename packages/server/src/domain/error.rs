//! Domain-level error types.

use thiserror::Error;

/// Validation failures for value objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    EmptyId(&'static str),

    #[error("{kind} must be at most {max} characters")]
    IdTooLong { kind: &'static str, max: usize },

    #[error("chat text must not be empty")]
    EmptyChatText,

    #[error("chat text must be at most {max} characters")]
    ChatTextTooLong { max: usize },
}

/// Credential verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingToken,

    #[error("invalid credential: {0}")]
    InvalidToken(String),

    #[error("credential carries an unusable identity: {0}")]
    InvalidIdentity(#[from] ValueObjectError),
}

/// Failures delivering to connections held by this instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection for user '{0}' not found")]
    ConnectionNotFound(String),

    #[error("connection for user '{0}' is closed")]
    ConnectionClosed(String),
}

/// Failures of the shared fan-out bus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("publish to topic '{topic}' failed: {reason}")]
    PublishFailed { topic: String, reason: String },
}

/// Failures of the bounded chat history store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("history store unavailable: {0}")]
    Unavailable(String),
}

/// Illegal transitions of a collaboration session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionStateError {
    #[error("session is already active")]
    AlreadyActive,

    #[error("session is closed")]
    Closed,

    #[error("session is not active yet")]
    NotActive,
}
