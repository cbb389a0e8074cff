//! Stateless email-verification tokens.
//!
//! A verification token is an HS256-signed claim set deriving entirely from
//! the user identity and a validity window; no store record backs it. The
//! link in a verification email is therefore proof that this server issued
//! it for this user within the window. Fulfillment is idempotent at the
//! credential store, which is what makes the token effectively single-use.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Claim identifying what the signature vouches for. Tokens signed with the
/// same key for another purpose must not validate here.
const PURPOSE: &str = "email-verify";

#[derive(Debug, Error)]
pub enum VerificationTokenError {
    #[error("verification token has expired")]
    Expired,
    /// Malformed token, bad signature, or wrong purpose claim. Collapsed
    /// into one variant so callers can't probe which check failed.
    #[error("invalid verification token")]
    Invalid,
    #[error("verification token signing failed")]
    SigningFailed,
}

#[derive(Debug, Serialize, Deserialize)]
struct VerificationClaims {
    sub: Uuid,
    purpose: String,
    iat: i64,
    exp: i64,
}

/// Issues and validates signed verification tokens.
pub struct VerificationTokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl fmt::Debug for VerificationTokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationTokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl VerificationTokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Sign a deliverable token for the given user.
    pub fn issue(&self, user_id: Uuid) -> Result<String, VerificationTokenError> {
        let now = Utc::now();
        let claims = VerificationClaims {
            sub: user_id,
            purpose: PURPOSE.to_owned(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| VerificationTokenError::SigningFailed)
    }

    /// Validate a token and return the user it was issued for. Expiry is
    /// distinguished from every other failure; the rest collapse into
    /// [`VerificationTokenError::Invalid`].
    pub fn validate(&self, token: &str) -> Result<Uuid, VerificationTokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<VerificationClaims>(token, &self.decoding, &validation)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => VerificationTokenError::Expired,
                _ => VerificationTokenError::Invalid,
            })?;

        if data.claims.purpose != PURPOSE {
            return Err(VerificationTokenError::Invalid);
        }

        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_and_validates() {
        let issuer = VerificationTokenIssuer::new(b"signing-secret", Duration::minutes(60));
        let user_id = Uuid::now_v7();

        let token = issuer.issue(user_id).unwrap();
        assert_eq!(issuer.validate(&token).unwrap(), user_id);
    }

    #[test]
    fn rejects_expired_tokens() {
        let issuer = VerificationTokenIssuer::new(b"signing-secret", Duration::minutes(-5));
        let token = issuer.issue(Uuid::now_v7()).unwrap();

        assert!(matches!(
            issuer.validate(&token),
            Err(VerificationTokenError::Expired)
        ));
    }

    #[test]
    fn rejects_foreign_signatures() {
        let issuer = VerificationTokenIssuer::new(b"signing-secret", Duration::minutes(60));
        let forger = VerificationTokenIssuer::new(b"other-secret", Duration::minutes(60));

        let token = forger.issue(Uuid::now_v7()).unwrap();
        assert!(matches!(
            issuer.validate(&token),
            Err(VerificationTokenError::Invalid)
        ));
    }

    #[test]
    fn rejects_garbage() {
        let issuer = VerificationTokenIssuer::new(b"signing-secret", Duration::minutes(60));
        assert!(matches!(
            issuer.validate("not-a-token"),
            Err(VerificationTokenError::Invalid)
        ));
    }
}
