use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    key        TEXT NOT NULL,
    value      JSONB NOT NULL,
    PRIMARY KEY (collection, key)
)
"#;

/// Creates a PostgreSQL connection pool and makes sure the record table exists.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    sqlx::query(SCHEMA).execute(&pool).await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}
