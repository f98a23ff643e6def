use std::sync::Arc;

use crate::auth::session::SessionStore;
use crate::auth::OwnerCredentials;
use crate::config::Config;
use crate::llm_client::ChatCompletion;
use crate::storage::blob::BlobStore;
use crate::storage::Tables;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub tables: Tables,
    pub sessions: Arc<dyn SessionStore>,
    /// Completion collaborator. `LlmClient` in production, scripted in tests.
    pub llm: Arc<dyn ChatCompletion>,
    /// `None` when no bucket is configured; uploads of originals are skipped.
    pub blobs: Option<BlobStore>,
    pub owner: OwnerCredentials,
    pub config: Config,
}
