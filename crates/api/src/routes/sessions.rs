//! Chat session routes
//!
//! The REST surface over the transcript store: the worklist for the agent
//! console, transcript reads and appends for both endpoints, read marking,
//! and agent-side deletion.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use florachat_engine::session_summaries;
use florachat_shared::{mark_all_read, ChatMessage, SessionSummary};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct SessionsListResponse {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List every known session, most recently active first
pub async fn list_sessions(State(state): State<AppState>) -> ApiResult<Json<SessionsListResponse>> {
    let sessions = session_summaries(state.store.as_ref()).await?;
    Ok(Json(SessionsListResponse { sessions }))
}

/// Load one session's stored transcript
///
/// An absent session is a valid empty state, not an error; the customer
/// endpoint substitutes its own greeting.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<MessagesResponse>> {
    let messages = state.store.load(&session_id).await?;
    Ok(Json(MessagesResponse { messages }))
}

/// Append one message to a session's transcript
pub async fn append_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(message): Json<ChatMessage>,
) -> ApiResult<(StatusCode, Json<ChatMessage>)> {
    if message.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message text is required".to_string()));
    }

    state.store.append(&session_id, &message).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Mark every message in a session as read
pub async fn mark_read(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    mark_all_read(state.store.as_ref(), &session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a session's transcript outright (agent console action)
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    let removed = state.store.delete(&session_id).await?;
    if !removed {
        return Err(ApiError::NotFound);
    }

    if let Some(responder) = &state.responder {
        responder.forget(&session_id);
    }

    tracing::info!(session_id = %session_id, "Chat session deleted");
    Ok(StatusCode::NO_CONTENT)
}
