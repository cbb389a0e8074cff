//! Persistence ports for users, sessions, and reset tokens.
//!
//! The traits keep the flows independent of any concrete store; the crate
//! ships in-memory implementations under [`crate::infrastructure::memory`]
//! and a host can provide database-backed ones. Uniqueness and atomicity
//! guarantees are part of these contracts, not of the callers:
//! email uniqueness is enforced inside `create`/`update_profile`, and reset
//! redemption is a single atomic fetch-and-invalidate.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::email::EmailAddress;
use super::user::{ProfileUpdate, User};
use crate::session::Session;
use crate::token::reset::ResetTokenRecord;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("email already exists")]
    EmailExists,

    /// Store connectivity or query failure; surfaces as the flows' sole
    /// fatal condition.
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Credential store: the single source of truth for account records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new account. Fails with [`RepositoryError::EmailExists`] if
    /// the address is taken; the check and the insert are one atomic step.
    async fn create(&self, user: User) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>, RepositoryError>;

    /// Apply a partial profile update. An email change re-checks uniqueness
    /// under the same atomicity rule as `create`.
    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<User, RepositoryError>;

    /// Set the verified timestamp. Idempotent: verifying an already-verified
    /// account succeeds without changing the original timestamp.
    async fn verify_email(&self, id: Uuid) -> Result<(), RepositoryError>;

    async fn set_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), RepositoryError>;

    /// Replace the remember token, invalidating long-lived logins elsewhere.
    async fn rotate_remember_token(
        &self,
        id: Uuid,
        token_hash: &str,
    ) -> Result<(), RepositoryError>;
}

/// Session store, keyed by the HMAC hash of the session secret.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: Session) -> Result<(), RepositoryError>;

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, RepositoryError>;

    /// Remove a session. Idempotent: removing an absent session succeeds.
    async fn remove_by_hash(&self, token_hash: &str) -> Result<(), RepositoryError>;

    /// Drop every session belonging to a user, returning how many were
    /// removed. Used after a password reset to force re-login elsewhere.
    async fn revoke_for_user(&self, user_id: Uuid) -> Result<u64, RepositoryError>;
}

/// Reset-token store, keyed by email. One outstanding record per address:
/// inserting replaces any prior record for that email.
#[async_trait]
pub trait ResetTokenRepository: Send + Sync {
    async fn put(&self, record: ResetTokenRecord) -> Result<(), RepositoryError>;

    /// Atomically remove and return the record for `email` iff its stored
    /// hash equals `token_hash`. Concurrent redeemers of the same token see
    /// exactly one `Some`; a wrong hash leaves the record in place and
    /// returns `None`.
    async fn consume(
        &self,
        email: &EmailAddress,
        token_hash: &str,
    ) -> Result<Option<ResetTokenRecord>, RepositoryError>;
}
