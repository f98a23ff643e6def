use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::Identity;
use crate::chat::ChatTranscript;
use crate::errors::AppError;
use crate::interview::machine::InterviewState;
use crate::models::Role;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt session: {0}")]
    Serde(#[from] serde_json::Error),

    /// Logged out or timed out while the request was running.
    #[error("Session no longer exists")]
    Expired,

    /// Another request on the same token saved first.
    #[error("Session was saved by a concurrent request")]
    Stale,
}

/// Per-login interaction context. Loaded at the start of each request and
/// saved back after it; never written to the account collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: Uuid,
    pub role: Role,
    pub email: String,
    #[serde(default)]
    pub selected_company: Option<String>,
    #[serde(default)]
    pub interview: InterviewState,
    #[serde(default)]
    pub chat: ChatTranscript,
    pub created_at: DateTime<Utc>,
    /// Bumped by every successful save.
    #[serde(default)]
    pub version: u64,
}

impl Session {
    pub fn new(identity: Identity) -> Self {
        Self {
            token: Uuid::new_v4(),
            role: identity.role,
            email: identity.email,
            selected_company: None,
            interview: InterviewState::default(),
            chat: ChatTranscript::default(),
            created_at: Utc::now(),
            version: 0,
        }
    }

    pub fn require(&self, role: Role) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, token: Uuid) -> Result<Option<Session>, SessionError>;

    /// Stores a freshly issued session.
    async fn create(&self, session: &Session) -> Result<(), SessionError>;

    /// Writes back a loaded session and refreshes its expiry. Only succeeds
    /// while the stored copy still exists at the version that was loaded;
    /// bumps `session.version` on success.
    async fn save(&self, session: &mut Session) -> Result<(), SessionError>;

    async fn discard(&self, token: Uuid) -> Result<(), SessionError>;
}

/// Process-local sessions; lost on restart.
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<Uuid, (Session, Instant)>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: Uuid) -> Result<Option<Session>, SessionError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&token)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(session, _)| session.clone()))
    }

    async fn create(&self, session: &Session) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        sessions.retain(|_, (_, expires)| *expires > now);
        sessions.insert(session.token, (session.clone(), now + self.ttl));
        Ok(())
    }

    async fn save(&self, session: &mut Session) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let Some((stored, expires)) = sessions
            .get_mut(&session.token)
            .filter(|(_, expires)| *expires > now)
        else {
            return Err(SessionError::Expired);
        };
        if stored.version != session.version {
            return Err(SessionError::Stale);
        }
        session.version += 1;
        *stored = session.clone();
        *expires = now + self.ttl;
        Ok(())
    }

    async fn discard(&self, token: Uuid) -> Result<(), SessionError> {
        self.sessions.write().await.remove(&token);
        Ok(())
    }
}

/// Replaces `KEYS[1]` with `ARGV[2]` only if it exists at version `ARGV[1]`.
/// Returns -1 when the key is gone, 0 when the version moved on, 1 on write.
const SAVE_IF_CURRENT: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
    return -1
end
local stored = cjson.decode(current)['version'] or 0
if tonumber(stored) ~= tonumber(ARGV[1]) then
    return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
return 1
"#;

/// Sessions as JSON strings under `session:<token>` with a Redis TTL, so any
/// API instance can serve any request.
pub struct RedisSessionStore {
    conn: redis::aio::MultiplexedConnection,
    ttl_secs: u64,
    save_if_current: redis::Script,
}

impl RedisSessionStore {
    pub async fn connect(redis_url: &str, ttl_secs: u64) -> Result<Self, SessionError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            ttl_secs,
            save_if_current: redis::Script::new(SAVE_IF_CURRENT),
        })
    }

    fn key(token: Uuid) -> String {
        format!("session:{token}")
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, token: Uuid) -> Result<Option<Session>, SessionError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::key(token))
            .query_async(&mut conn)
            .await?;
        Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
    }

    async fn create(&self, session: &Session) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        let body = serde_json::to_string(session)?;
        let written: Option<String> = redis::cmd("SET")
            .arg(Self::key(session.token))
            .arg(body)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await?;
        match written {
            Some(_) => Ok(()),
            None => Err(SessionError::Stale),
        }
    }

    async fn save(&self, session: &mut Session) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        let loaded = session.version;
        let mut next = session.clone();
        next.version = loaded + 1;
        let body = serde_json::to_string(&next)?;

        let outcome: i64 = self
            .save_if_current
            .key(Self::key(session.token))
            .arg(loaded)
            .arg(body)
            .arg(self.ttl_secs)
            .invoke_async(&mut conn)
            .await?;
        match outcome {
            1 => {
                session.version = next.version;
                Ok(())
            }
            -1 => Err(SessionError::Expired),
            _ => Err(SessionError::Stale),
        }
    }

    async fn discard(&self, token: Uuid) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(Self::key(token))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            role: Role::User,
            email: "ana@x.io".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_save_load_discard() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let mut session = Session::new(identity());
        session.selected_company = Some("hr@companyx.io".to_string());
        store.create(&session).await.unwrap();

        let loaded = store.load(session.token).await.unwrap().unwrap();
        assert_eq!(loaded.selected_company.as_deref(), Some("hr@companyx.io"));

        store.discard(session.token).await.unwrap();
        assert!(store.load(session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_expires_sessions() {
        let store = MemorySessionStore::new(Duration::from_millis(0));
        let mut session = Session::new(identity());
        store.create(&session).await.unwrap();
        assert!(store.load(session.token).await.unwrap().is_none());
        assert!(matches!(
            store.save(&mut session).await,
            Err(SessionError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_save_after_logout_does_not_resurrect() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let session = Session::new(identity());
        store.create(&session).await.unwrap();

        let mut in_flight = store.load(session.token).await.unwrap().unwrap();
        store.discard(session.token).await.unwrap();
        in_flight.selected_company = Some("hr@companyx.io".to_string());

        assert!(matches!(
            store.save(&mut in_flight).await,
            Err(SessionError::Expired)
        ));
        assert!(store.load(session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_save_is_rejected_as_stale() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let session = Session::new(identity());
        store.create(&session).await.unwrap();

        let mut first = store.load(session.token).await.unwrap().unwrap();
        let mut second = store.load(session.token).await.unwrap().unwrap();

        first.selected_company = Some("hr@companyx.io".to_string());
        store.save(&mut first).await.unwrap();
        assert_eq!(first.version, 1);

        second.selected_company = Some("jobs@techcorp.io".to_string());
        assert!(matches!(
            store.save(&mut second).await,
            Err(SessionError::Stale)
        ));

        let stored = store.load(session.token).await.unwrap().unwrap();
        assert_eq!(stored.selected_company.as_deref(), Some("hr@companyx.io"));
        assert_eq!(stored.version, 1);

        // A reload picks up the winner's version and can save again.
        let mut retry = stored;
        store.save(&mut retry).await.unwrap();
        assert_eq!(retry.version, 2);
    }

    #[test]
    fn test_require_role() {
        let session = Session::new(identity());
        assert!(session.require(Role::User).is_ok());
        assert!(matches!(session.require(Role::Owner), Err(AppError::Forbidden)));
    }

    #[test]
    fn test_session_json_defaults_missing_state() {
        let token = Uuid::new_v4();
        let json = format!(
            r#"{{"token":"{token}","role":"company","email":"hr@x.io","created_at":"2026-01-01T00:00:00Z"}}"#
        );
        let session: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(session.role, Role::Company);
        assert!(session.chat.is_empty());
        assert_eq!(session.interview.step(), 0);
        assert_eq!(session.version, 0);
    }
}
