//! Delivery port for connections held by this instance.

use async_trait::async_trait;

use super::{
    error::MessagePushError,
    value_object::{DocumentId, UserId},
};

/// Delivers serialized server messages to live connections of a document.
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// Deliver `content` to one user's connection.
    async fn push_to(
        &self,
        document_id: &DocumentId,
        user_id: &UserId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// Deliver `content` to every writable connection of `document_id`
    /// except `exclude`. Returns the number of connections reached.
    ///
    /// A document without a session is a no-op; a failing recipient is
    /// skipped without affecting the others.
    async fn broadcast(
        &self,
        document_id: &DocumentId,
        content: &str,
        exclude: Option<&UserId>,
    ) -> usize;
}
