//! Axum route handlers for the Owner Console.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::extract::CurrentSession;
use crate::errors::AppError;
use crate::models::Role;
use crate::owner::{clear_companies, clear_users, delete_company, delete_user, metrics, PlatformMetrics};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Metrics
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/owner/metrics
pub async fn handle_metrics(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<PlatformMetrics>, AppError> {
    session.require(Role::Owner)?;
    Ok(Json(metrics(&state.tables).await?))
}

// ────────────────────────────────────────────────────────────────────────────
// Deletion
// ────────────────────────────────────────────────────────────────────────────

/// DELETE /api/v1/owner/users
pub async fn handle_clear_users(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<StatusCode, AppError> {
    session.require(Role::Owner)?;
    clear_users(&state.tables, &session.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/owner/users/:email
pub async fn handle_delete_user(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(email): Path<String>,
) -> Result<StatusCode, AppError> {
    session.require(Role::Owner)?;
    delete_user(&state.tables, &session.email, &email).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/owner/companies
pub async fn handle_clear_companies(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<StatusCode, AppError> {
    session.require(Role::Owner)?;
    clear_companies(&state.tables, &session.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/owner/companies/:email
pub async fn handle_delete_company(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(email): Path<String>,
) -> Result<StatusCode, AppError> {
    session.require(Role::Owner)?;
    delete_company(&state.tables, &session.email, &email).await?;
    Ok(StatusCode::NO_CONTENT)
}
