//! Resume upload route.

use axum::{extract::{Multipart, State}, Json};
use chrono::Utc;

use crate::auth::extract::CurrentSession;
use crate::errors::AppError;
use crate::matching::{upload_resume, MatchReport, MatchSettings};
use crate::models::Role;
use crate::routes::upload::read_file_field;
use crate::state::AppState;

/// POST /api/v1/users/me/resume
///
/// Multipart field `file`: PDF, DOCX or plain text. Replaces the stored resume and
/// every schedule entry of the caller, and remembers the first selecting
/// company for the interview.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
    multipart: Multipart,
) -> Result<Json<MatchReport>, AppError> {
    session.require(Role::User)?;
    let file = read_file_field(multipart, "file").await?;

    let report = upload_resume(
        &state.tables,
        state.blobs.as_ref(),
        state.llm.clone(),
        &MatchSettings::from_config(&state.config),
        &session.email,
        file,
        Utc::now().date_naive(),
    )
    .await?;

    session.selected_company = report.first_selected().map(str::to_string);
    state.sessions.save(&mut session).await?;

    Ok(Json(report))
}
