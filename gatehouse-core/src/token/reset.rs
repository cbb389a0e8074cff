//! Stateful password-reset tokens.
//!
//! A reset token is a random 256-bit secret proving control of the reset
//! email flow. The raw secret goes into the email; only its HMAC hash is
//! stored, inside a [`ResetTokenRecord`] keyed by email. Redemption is
//! single-use by contract of
//! [`ResetTokenRepository::consume`](crate::domain::repositories::ResetTokenRepository::consume).

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::{TryRngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::email::EmailAddress;

#[derive(Debug, Error)]
pub enum ResetTokenError {
    #[error("reset token generation failed")]
    GenerationFailed,
}

/// Freshly generated reset secret. Exists only between issuance and the
/// notification email; stores never see it.
#[derive(Debug)]
pub struct ResetToken {
    value: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl ResetToken {
    /// Generate a new 256-bit secret with the given lifetime.
    pub fn generate(lifetime: Duration) -> Result<Self, ResetTokenError> {
        let mut secret = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut secret)
            .map_err(|_| ResetTokenError::GenerationFailed)?;

        let issued_at = Utc::now();
        Ok(Self {
            value: URL_SAFE_NO_PAD.encode(secret),
            issued_at,
            expires_at: issued_at + lifetime,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl Drop for ResetToken {
    fn drop(&mut self) {
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

/// Stored form of an outstanding reset token: the email it was issued for,
/// the HMAC hash of the secret, and the expiry checked at redemption time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetTokenRecord {
    pub email: EmailAddress,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ResetTokenRecord {
    pub fn new(email: EmailAddress, token_hash: String, token: &ResetToken) -> Self {
        Self {
            email,
            token_hash,
            created_at: token.issued_at(),
            expires_at: token.expires_at(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
