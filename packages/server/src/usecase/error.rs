//! UseCase-level error types.

use thiserror::Error;

use crate::domain::{AuthError, HistoryError, SessionStateError, ValueObjectError};

/// Failures while admitting a connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("authentication failed: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("session transition failed: {0}")]
    InvalidState(#[from] SessionStateError),

    #[error("failed to encode server message: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures handling one inbound frame. None of them closes the connection.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] ValueObjectError),

    #[error("session is not active: {0}")]
    NotActive(#[from] SessionStateError),

    #[error("failed to encode server message: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures reading chat history.
#[derive(Debug, Error)]
pub enum HistoryQueryError {
    #[error(transparent)]
    Store(#[from] HistoryError),
}
