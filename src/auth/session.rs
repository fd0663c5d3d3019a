use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::sync::Mutex;

/// Lifetime of a session from the moment it is minted (10 hours).
pub const SESSION_TTL_SECS: i64 = 36_000;

/// Longest lifetime a configured session may have (one year).
pub const MAX_SESSION_TTL_SECS: i64 = 366 * 24 * 60 * 60;

/// Bytes of entropy in a session token. Hex-encoded, so tokens are twice as long.
const TOKEN_BYTES: usize = 16;

/// Server-held record binding a token to a user identity until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A freshly minted token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Entropy source failure: {0}")]
    Entropy(#[from] rand::Error),

    #[error("Session expiry out of range for ttl {0}")]
    ExpiryOutOfRange(Duration),
}

/// Process-wide token -> session map. Sessions are replaced, never mutated.
/// Expired entries are removed lazily by `resolve`.
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(SESSION_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a new session for a user. Returns the token and its expiry.
    pub async fn create(
        &self,
        username: &str,
        user_id: &str,
    ) -> Result<IssuedSession, SessionError> {
        let token = generate_token()?;
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or(SessionError::ExpiryOutOfRange(self.ttl))?;

        let mut sessions = self.sessions.lock().await;
        sessions.insert(
            token.clone(),
            Session {
                user_id: user_id.to_string(),
                username: username.to_string(),
                expires_at,
            },
        );

        Ok(IssuedSession { token, expires_at })
    }

    /// Look up a live session. An expired entry is deleted and reported as absent.
    pub async fn resolve(&self, token: &str) -> Option<Session> {
        self.resolve_at(token, Utc::now()).await
    }

    async fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get(token)?.clone();
        if session.is_expired_at(now) {
            tracing::debug!("Session for {} expired, removing", session.username);
            sessions.remove(token);
            return None;
        }
        Some(session)
    }

    /// Remove a session. Absent tokens are ignored.
    pub async fn invalidate(&self, token: &str) {
        self.sessions.lock().await.remove(token);
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a 128-bit random token from the OS entropy source, hex encoded.
fn generate_token() -> Result<String, SessionError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(hex::encode(bytes))
}
