use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Where the account and schedule collections live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// One pretty-printed JSON document per collection under `dir`.
    File { dir: PathBuf },
    Postgres { database_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionBackend {
    Memory,
    Redis { redis_url: String },
}

/// S3 / MinIO settings. Uploads of resume originals and logos are disabled
/// when this group is absent.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub anthropic_api_key: String,
    pub llm_timeout_secs: u64,
    pub storage: StorageBackend,
    pub sessions: SessionBackend,
    pub session_ttl_secs: u64,
    pub s3: Option<S3Config>,
    pub owner_email: String,
    /// bcrypt hash of the owner password. Never the password itself.
    pub owner_password_hash: String,
    pub bcrypt_cost: u32,
    pub chat_max_turns: usize,
    pub match_feedback_concurrency: usize,
    pub match_rejection_feedback: bool,
    pub interview_lead_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests can avoid
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let storage = match env.or("STORAGE_BACKEND", "file").as_str() {
            "file" => StorageBackend::File {
                dir: PathBuf::from(env.or("DATA_DIR", "./data")),
            },
            "postgres" => StorageBackend::Postgres {
                database_url: env.require("DATABASE_URL")?,
            },
            other => bail!("STORAGE_BACKEND must be 'file' or 'postgres', got '{other}'"),
        };

        let sessions = match env.or("SESSION_BACKEND", "memory").as_str() {
            "memory" => SessionBackend::Memory,
            "redis" => SessionBackend::Redis {
                redis_url: env.require("REDIS_URL")?,
            },
            other => bail!("SESSION_BACKEND must be 'memory' or 'redis', got '{other}'"),
        };

        let s3 = match env.get("S3_BUCKET") {
            Some(bucket) => Some(S3Config {
                bucket,
                endpoint: env.require("S3_ENDPOINT")?,
                access_key_id: env.require("AWS_ACCESS_KEY_ID")?,
                secret_access_key: env.require("AWS_SECRET_ACCESS_KEY")?,
            }),
            None => None,
        };

        let bcrypt_cost = env.parsed("BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31");
        }

        let chat_max_turns = env.parsed("CHAT_MAX_TURNS", 20usize)?;
        if chat_max_turns < 2 {
            bail!("CHAT_MAX_TURNS must be at least 2");
        }

        Ok(Config {
            port: env.parsed("PORT", 8080u16)?,
            rust_log: env.or("RUST_LOG", "info"),
            anthropic_api_key: env.require("ANTHROPIC_API_KEY")?,
            llm_timeout_secs: env.parsed("LLM_TIMEOUT_SECS", 60u64)?,
            storage,
            sessions,
            session_ttl_secs: env.parsed("SESSION_TTL_SECS", 86_400u64)?,
            s3,
            owner_email: env.require("OWNER_EMAIL")?.trim().to_lowercase(),
            owner_password_hash: env.require("OWNER_PASSWORD_HASH")?,
            bcrypt_cost,
            chat_max_turns,
            match_feedback_concurrency: env.parsed("MATCH_FEEDBACK_CONCURRENCY", 4usize)?.max(1),
            match_rejection_feedback: env.parsed("MATCH_REJECTION_FEEDBACK", true)?,
            interview_lead_days: env.parsed("INTERVIEW_LEAD_DAYS", 7i64)?,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .with_context(|| format!("Required environment variable '{key}' is not set"))
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("{key} has an invalid value '{raw}'")),
            None => Ok(default),
        }
    }
}
