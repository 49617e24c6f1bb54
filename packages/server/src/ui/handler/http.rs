//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    domain::DocumentId,
    infrastructure::dto::{
        conversion::roster_to_dto,
        http::{ChatEntryDto, ChatHistoryDto, ChatHistoryQuery, CollaboratorsDto, HealthDto},
    },
    ui::state::AppState,
};

fn parse_document_id(raw: String) -> Result<DocumentId, StatusCode> {
    DocumentId::try_from(raw.clone()).map_err(|e| {
        tracing::warn!("Invalid document id '{}': {}", raw, e);
        StatusCode::BAD_REQUEST
    })
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthDto> {
    let active_sessions = state.get_collaborators_usecase.active_sessions().await;
    Json(HealthDto {
        status: "ok".to_string(),
        active_sessions,
    })
}

/// Recent chat of a document, oldest first
pub async fn get_chat_history(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
    Query(query): Query<ChatHistoryQuery>,
) -> Result<Json<ChatHistoryDto>, StatusCode> {
    let document_id = parse_document_id(document_id)?;

    match state
        .get_chat_history_usecase
        .execute(&document_id, query.limit)
        .await
    {
        Ok(entries) => Ok(Json(ChatHistoryDto {
            document_id: document_id.as_str().to_string(),
            mensagens: entries.into_iter().map(ChatEntryDto::from).collect(),
        })),
        Err(e) => {
            tracing::error!("Chat history of '{}' unavailable: {}", document_id, e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Current roster of a document
pub async fn get_collaborators(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<Json<CollaboratorsDto>, StatusCode> {
    let document_id = parse_document_id(document_id)?;
    let roster = state.get_collaborators_usecase.execute(&document_id).await;

    Ok(Json(CollaboratorsDto {
        document_id: document_id.as_str().to_string(),
        colaboradores: roster_to_dto(roster),
    }))
}
