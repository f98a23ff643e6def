//! Axum route handlers for the mock interview.

use axum::{extract::State, Json};

use crate::auth::extract::CurrentSession;
use crate::errors::AppError;
use crate::interview::{
    start_interview, submit_answer, AnswerRequest, AnswerResponse, InterviewView, StartRequest,
};
use crate::models::Role;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/interview
pub async fn handle_get_interview(
    CurrentSession(session): CurrentSession,
) -> Result<Json<InterviewView>, AppError> {
    session.require(Role::User)?;
    Ok(Json(InterviewView::from(&session.interview)))
}

/// POST /api/v1/interview/start
pub async fn handle_start_interview(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
    Json(req): Json<StartRequest>,
) -> Result<Json<InterviewView>, AppError> {
    session.require(Role::User)?;
    let view = start_interview(&state.tables, state.llm.as_ref(), &mut session, req).await?;
    state.sessions.save(&mut session).await?;
    Ok(Json(view))
}

/// POST /api/v1/interview/answer
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    session.require(Role::User)?;
    let response = submit_answer(&state.tables, state.llm.as_ref(), &mut session, req).await?;
    state.sessions.save(&mut session).await?;
    Ok(Json(response))
}
