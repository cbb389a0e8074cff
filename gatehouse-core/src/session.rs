//! Sessions binding a client to an authenticated identity.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::{TryRngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session secret generation failed")]
    GenerationFailed,
}

/// Stored session record. Holds only the HMAC hash of the secret; the raw
/// secret lives in the client's cookie and nowhere else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Whether this session was established with the long-lived TTL.
    pub remember: bool,
}

impl Session {
    pub fn new(user_id: Uuid, token_hash: String, remember: bool, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            token_hash,
            created_at: now,
            expires_at: now + ttl,
            remember,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.expires_at > Utc::now()
    }
}

/// Session lifetimes. The short TTL applies to ordinary logins, the long
/// one when the user asked to be remembered.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub session_ttl: Duration,
    pub remember_ttl: Duration,
}

impl SessionConfig {
    /// TTL selected by the `remember` flag at login.
    pub fn ttl_for(&self, remember: bool) -> Duration {
        if remember {
            self.remember_ttl
        } else {
            self.session_ttl
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(24),
            remember_ttl: Duration::days(30),
        }
    }
}

/// Result of a successful login: the stored record plus the raw secret for
/// the client. The secret is handed out exactly once.
#[derive(Debug)]
pub struct SessionHandle {
    pub session: Session,
    pub secret: String,
}

/// Generate a 256-bit URL-safe session secret.
pub fn generate_session_secret() -> Result<String, SessionError> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|_| SessionError::GenerationFailed)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
