//! Axum route handlers for the LAKS assistant.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::auth::extract::CurrentSession;
use crate::errors::AppError;
use crate::llm_client::ChatMessage;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub reply: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/chat
pub async fn handle_get_transcript(
    CurrentSession(session): CurrentSession,
) -> Json<Vec<ChatMessage>> {
    Json(session.chat.turns().cloned().collect())
}

/// POST /api/v1/chat
pub async fn handle_ask(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let reply = session
        .chat
        .ask(state.llm.as_ref(), &req.message, state.config.chat_max_turns)
        .await?;
    state.sessions.save(&mut session).await?;
    Ok(Json(AskResponse { reply }))
}

/// DELETE /api/v1/chat
pub async fn handle_clear_transcript(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
) -> Result<StatusCode, AppError> {
    session.chat.clear();
    state.sessions.save(&mut session).await?;
    Ok(StatusCode::NO_CONTENT)
}
