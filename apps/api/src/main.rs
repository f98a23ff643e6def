mod accounts;
mod auth;
mod chat;
mod config;
mod db;
mod errors;
mod interview;
mod llm_client;
mod matching;
mod models;
mod owner;
mod routes;
mod state;
mod storage;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::session::{MemorySessionStore, RedisSessionStore, SessionStore};
use crate::auth::OwnerCredentials;
use crate::config::{Config, SessionBackend, StorageBackend};
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::blob::BlobStore;
use crate::storage::file::JsonFileStore;
use crate::storage::postgres::PgStore;
use crate::storage::{KvStore, Tables};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting IntelliHire API v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn KvStore> = match &config.storage {
        StorageBackend::File { dir } => {
            info!("Using JSON document storage in {}", dir.display());
            Arc::new(JsonFileStore::open(dir.clone())?)
        }
        StorageBackend::Postgres { database_url } => {
            Arc::new(PgStore::new(create_pool(database_url).await?))
        }
    };

    let ttl = config.session_ttl_secs;
    let sessions: Arc<dyn SessionStore> = match &config.sessions {
        SessionBackend::Memory => Arc::new(MemorySessionStore::new(Duration::from_secs(ttl))),
        SessionBackend::Redis { redis_url } => {
            let store = RedisSessionStore::connect(redis_url, ttl).await?;
            info!("Redis session store connected");
            Arc::new(store)
        }
    };

    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let blobs = match &config.s3 {
        Some(s3) => Some(BlobStore::connect(s3).await),
        None => {
            info!("S3_BUCKET not set; original uploads will not be stored");
            None
        }
    };

    let tables = Tables::new(store);
    let reserved = accounts::backfill_reservations(&tables).await?;
    if reserved > 0 {
        info!("Reserved {reserved} pre-existing account emails");
    }

    let state = AppState {
        tables,
        sessions,
        llm: Arc::new(llm),
        blobs,
        owner: OwnerCredentials {
            email: config.owner_email.clone(),
            password_hash: config.owner_password_hash.clone(),
        },
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
