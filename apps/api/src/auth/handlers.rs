//! Axum route handlers for login, logout and session inspection.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::extract::CurrentSession;
use crate::auth::session::Session;
use crate::auth::authenticate;
use crate::errors::AppError;
use crate::models::Role;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Restricts the check to one account table.
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: Uuid,
    pub role: Role,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub role: Role,
    pub email: String,
    pub selected_company: Option<String>,
    pub interview_in_progress: bool,
    pub interview_step: usize,
    pub chat_turns: usize,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            role: session.role,
            email: session.email.clone(),
            selected_company: session.selected_company.clone(),
            interview_in_progress: session.interview.is_in_progress(),
            interview_step: session.interview.step(),
            chat_turns: session.chat.len(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let identity =
        authenticate(&state.tables, &state.owner, &req.email, &req.password, req.role).await?;
    let session = Session::new(identity);
    state.sessions.create(&session).await?;
    info!("{} logged in as {}", session.email, session.role);

    Ok(Json(LoginResponse {
        token: session.token,
        role: session.role,
        email: session.email,
    }))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<StatusCode, AppError> {
    state.sessions.discard(session.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/session
pub async fn handle_session(
    CurrentSession(session): CurrentSession,
) -> Json<SessionSummary> {
    Json(SessionSummary::from(&session))
}
