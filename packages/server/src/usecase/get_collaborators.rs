//! UseCase: read-only view of the local presence roster.

use std::sync::Arc;

use crate::domain::{Collaborator, DocumentId, SessionRegistry};

pub struct GetCollaboratorsUseCase {
    registry: Arc<SessionRegistry>,
}

impl GetCollaboratorsUseCase {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Collaborators of `document_id` connected to this instance.
    pub async fn execute(&self, document_id: &DocumentId) -> Vec<Collaborator> {
        self.registry.snapshot(document_id).await
    }

    /// Number of document sessions alive on this instance.
    pub async fn active_sessions(&self) -> usize {
        self.registry.session_count().await
    }
}
