pub mod health;
pub mod upload;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::accounts::handlers as accounts;
use crate::auth::handlers as auth;
use crate::chat::handlers as chat;
use crate::interview::handlers as interview;
use crate::matching::handlers as matching;
use crate::owner::handlers as owner;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Identity
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/logout", post(auth::handle_logout))
        .route("/api/v1/auth/session", get(auth::handle_session))
        // Users
        .route("/api/v1/users", post(accounts::handle_register_user))
        .route("/api/v1/users/me", get(accounts::handle_get_me))
        .route(
            "/api/v1/users/me/profile",
            put(accounts::handle_update_profile),
        )
        .route(
            "/api/v1/users/me/resume",
            post(matching::handle_upload_resume),
        )
        .route(
            "/api/v1/users/me/schedule",
            get(accounts::handle_get_schedule),
        )
        // Companies
        .route(
            "/api/v1/companies",
            post(accounts::handle_register_company).get(accounts::handle_list_companies),
        )
        .route(
            "/api/v1/companies/me/logo",
            post(accounts::handle_upload_logo),
        )
        .route(
            "/api/v1/companies/me/applicants",
            get(accounts::handle_list_applicants),
        )
        // Mock interview
        .route("/api/v1/interview", get(interview::handle_get_interview))
        .route(
            "/api/v1/interview/start",
            post(interview::handle_start_interview),
        )
        .route(
            "/api/v1/interview/answer",
            post(interview::handle_submit_answer),
        )
        // LAKS assistant
        .route(
            "/api/v1/chat",
            get(chat::handle_get_transcript)
                .post(chat::handle_ask)
                .delete(chat::handle_clear_transcript),
        )
        // Owner console
        .route("/api/v1/owner/metrics", get(owner::handle_metrics))
        .route("/api/v1/owner/users", delete(owner::handle_clear_users))
        .route(
            "/api/v1/owner/users/:email",
            delete(owner::handle_delete_user),
        )
        .route(
            "/api/v1/owner/companies",
            delete(owner::handle_clear_companies),
        )
        .route(
            "/api/v1/owner/companies/:email",
            delete(owner::handle_delete_company),
        )
        .with_state(state)
}
