//! Axum route handlers for user and company accounts.

use axum::{extract::{Multipart, State}, http::StatusCode, Json};

use crate::accounts::{
    company_applicants, get_user, register_company, register_user, set_company_logo, update_profile,
    Applicant, ProfileInput, RegisterCompanyRequest, RegisterUserRequest,
};
use crate::auth::extract::CurrentSession;
use crate::errors::AppError;
use crate::models::company::CompanyView;
use crate::models::schedule::UserSchedule;
use crate::models::user::UserView;
use crate::models::Role;
use crate::routes::upload::read_file_field;
use crate::state::AppState;

const LOGO_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

// ────────────────────────────────────────────────────────────────────────────
// Users
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/users
pub async fn handle_register_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    let user = register_user(&state.tables, &state.owner.email, state.config.bcrypt_cost, req).await?;
    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

/// GET /api/v1/users/me
pub async fn handle_get_me(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<UserView>, AppError> {
    session.require(Role::User)?;
    let user = get_user(&state.tables, &session.email).await?;
    Ok(Json(UserView::from(&user)))
}

/// PUT /api/v1/users/me/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(input): Json<ProfileInput>,
) -> Result<Json<UserView>, AppError> {
    session.require(Role::User)?;
    let user = update_profile(&state.tables, &session.email, input).await?;
    Ok(Json(UserView::from(&user)))
}

/// GET /api/v1/users/me/schedule
pub async fn handle_get_schedule(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<UserSchedule>, AppError> {
    session.require(Role::User)?;
    let schedule = state.tables.schedules.get(&session.email).await?;
    Ok(Json(schedule.unwrap_or_default()))
}

// ────────────────────────────────────────────────────────────────────────────
// Companies
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/companies
pub async fn handle_register_company(
    State(state): State<AppState>,
    Json(req): Json<RegisterCompanyRequest>,
) -> Result<(StatusCode, Json<CompanyView>), AppError> {
    let company =
        register_company(&state.tables, &state.owner.email, state.config.bcrypt_cost, req).await?;
    Ok((StatusCode::CREATED, Json(CompanyView::from(&company))))
}

/// GET /api/v1/companies
pub async fn handle_list_companies(
    State(state): State<AppState>,
) -> Result<Json<Vec<CompanyView>>, AppError> {
    let companies = state.tables.companies.load_all().await?;
    Ok(Json(companies.values().map(CompanyView::from).collect()))
}

/// POST /api/v1/companies/me/logo
pub async fn handle_upload_logo(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    multipart: Multipart,
) -> Result<Json<CompanyView>, AppError> {
    session.require(Role::Company)?;
    let file = read_file_field(multipart, "file").await?;

    let is_image = file
        .extension()
        .is_some_and(|ext| LOGO_EXTENSIONS.contains(&ext.as_str()));
    if !is_image {
        return Err(AppError::UnsupportedDocumentFormat(format!(
            "Logo must be one of {LOGO_EXTENSIONS:?}, got '{}'",
            file.file_name
        )));
    }

    let blobs = state
        .blobs
        .as_ref()
        .ok_or_else(|| AppError::S3("object storage is not configured".to_string()))?;
    let key = blobs
        .upload(
            "logos",
            &session.email,
            &file.file_name,
            file.content_type.as_deref(),
            file.bytes,
        )
        .await?;

    let company = set_company_logo(&state.tables, &session.email, key).await?;
    Ok(Json(CompanyView::from(&company)))
}

/// GET /api/v1/companies/me/applicants
pub async fn handle_list_applicants(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Vec<Applicant>>, AppError> {
    session.require(Role::Company)?;
    Ok(Json(company_applicants(&state.tables, &session.email).await?))
}
