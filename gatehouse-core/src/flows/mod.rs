//! User-facing identity flows.
//!
//! [`IdentityService`] orchestrates the credential store, token issuers,
//! session store, and collaborators into the register / verify / reset /
//! login flows. Identity is always passed in explicitly; nothing here reads
//! ambient state.

pub mod collaborators;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::GatehouseConfig;
use crate::crypto::{CredentialHasher, CryptoError};
use crate::domain::email::EmailAddress;
use crate::domain::repositories::{
    ResetTokenRepository, SessionRepository, UserRepository,
};
use crate::domain::user::{ProfileUpdate, ProfileView, User};
use crate::error::FlowError;
use crate::gate::Redirect;
use crate::policy::PasswordPolicy;
use crate::session::{Session, SessionConfig, SessionHandle, generate_session_secret};
use crate::token::reset::{ResetToken, ResetTokenRecord};
use crate::token::verification::{VerificationTokenError, VerificationTokenIssuer};

pub use collaborators::{AvatarStore, AvatarUpload, Notifier, avatar_file_name};

/// Input to [`IdentityService::register`].
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Input to [`IdentityService::login`].
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub remember: bool,
}

/// Input to [`IdentityService::reset_password`].
#[derive(Debug, Clone)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Input to [`IdentityService::edit_profile`]. Name and email are required;
/// the optional fields are applied only when present.
#[derive(Debug, Clone)]
pub struct EditProfileRequest {
    pub name: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Outcome of a verification re-request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    /// A fresh token went out; show the verification notice.
    Sent,
    /// Nothing to do; send the user elsewhere.
    Redirected(Redirect),
}

/// Orchestrates the identity lifecycle over injected stores and
/// collaborators.
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    reset_tokens: Arc<dyn ResetTokenRepository>,
    notifier: Arc<dyn Notifier>,
    avatars: Arc<dyn AvatarStore>,
    hasher: CredentialHasher,
    verification: VerificationTokenIssuer,
    session_config: SessionConfig,
    reset_ttl: chrono::Duration,
}

impl std::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService")
            .field("session_config", &self.session_config)
            .field("reset_ttl", &self.reset_ttl)
            .finish_non_exhaustive()
    }
}

impl IdentityService {
    pub fn new(
        config: &GatehouseConfig,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        reset_tokens: Arc<dyn ResetTokenRepository>,
        notifier: Arc<dyn Notifier>,
        avatars: Arc<dyn AvatarStore>,
    ) -> Result<Self, CryptoError> {
        let hasher = CredentialHasher::new(
            config.password_pepper.as_bytes(),
            config.token_hmac_key.as_bytes(),
        )?;
        Ok(Self::with_hasher(
            config,
            hasher,
            users,
            sessions,
            reset_tokens,
            notifier,
            avatars,
        ))
    }

    /// Like [`IdentityService::new`] with a caller-supplied hasher, so tests
    /// can run with cheap Argon2 parameters.
    pub fn with_hasher(
        config: &GatehouseConfig,
        hasher: CredentialHasher,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        reset_tokens: Arc<dyn ResetTokenRepository>,
        notifier: Arc<dyn Notifier>,
        avatars: Arc<dyn AvatarStore>,
    ) -> Self {
        Self {
            users,
            sessions,
            reset_tokens,
            notifier,
            avatars,
            hasher,
            verification: VerificationTokenIssuer::new(
                config.verification_secret.as_bytes(),
                config.verification_ttl,
            ),
            session_config: config.session.clone(),
            reset_ttl: config.reset_ttl,
        }
    }

    /// Create an unverified member account and send its verification email.
    pub async fn register(&self, request: RegisterRequest) -> Result<Redirect, FlowError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(FlowError::validation("name", "name is required"));
        }

        let email = EmailAddress::new(&request.email)
            .map_err(|err| FlowError::validation("email", err.to_string()))?;

        let check = PasswordPolicy::registration()
            .check(&request.password, &request.password_confirmation);
        if let Some(message) = check.first_message() {
            return Err(FlowError::validation("password", message));
        }

        let digest = self
            .hasher
            .hash_password(&request.password)
            .map_err(crypto_failure)?;

        let user = self
            .users
            .create(User::register(email, name.to_owned(), digest))
            .await?;

        let token = self
            .verification
            .issue(user.id)
            .map_err(|err| FlowError::Store(anyhow::anyhow!(err)))?;
        self.notifier.send_verification_email(&user, &token).await;

        info!(user_id = %user.id, "registered new account");
        Ok(Redirect::Home)
    }

    /// Fulfill a verification link. Idempotent when the account is already
    /// verified.
    pub async fn verify_email(&self, token: &str) -> Result<Redirect, FlowError> {
        let user_id = self.verification.validate(token).map_err(|err| match err {
            VerificationTokenError::Expired => FlowError::TokenExpired,
            _ => FlowError::TokenInvalid,
        })?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(FlowError::NotFound)?;

        if !user.has_verified_email() {
            self.users.verify_email(user.id).await?;
            info!(user_id = %user.id, "email verified");
        }

        Ok(Redirect::Home)
    }

    /// Re-request a verification email for the (explicitly passed) current
    /// user.
    pub async fn resend_verification(
        &self,
        current_user: Option<&User>,
    ) -> Result<ResendOutcome, FlowError> {
        let user = match current_user {
            None => return Ok(ResendOutcome::Redirected(Redirect::Login)),
            Some(user) if user.has_verified_email() => {
                return Ok(ResendOutcome::Redirected(Redirect::Profile));
            }
            Some(user) => user,
        };

        let token = self
            .verification
            .issue(user.id)
            .map_err(|err| FlowError::Store(anyhow::anyhow!(err)))?;
        self.notifier.send_verification_email(user, &token).await;

        debug!(user_id = %user.id, "verification email re-sent");
        Ok(ResendOutcome::Sent)
    }

    /// Issue a reset token for the address, if an account exists. The
    /// outcome is identical either way so the endpoint cannot be used to
    /// probe for registered emails; only a malformed address is an error.
    pub async fn forgot_password(&self, email: &str) -> Result<(), FlowError> {
        let email = EmailAddress::new(email)
            .map_err(|err| FlowError::validation("email", err.to_string()))?;

        match self.users.find_by_email(&email).await? {
            Some(user) => {
                let token = ResetToken::generate(self.reset_ttl)
                    .map_err(|err| FlowError::Store(anyhow::anyhow!(err)))?;
                let record = ResetTokenRecord::new(
                    email.clone(),
                    self.hasher.hash_token(token.as_str()),
                    &token,
                );
                self.reset_tokens.put(record).await?;
                self.notifier
                    .send_password_reset_email(&email, token.as_str())
                    .await;
                info!(user_id = %user.id, "password reset token issued");
            }
            None => {
                debug!("password reset requested for unknown address");
            }
        }

        Ok(())
    }

    /// Redeem a reset token and install the new password. Consumption is
    /// atomic at the store: of any number of concurrent redeemers, exactly
    /// one reaches the password update.
    pub async fn reset_password(
        &self,
        request: ResetPasswordRequest,
    ) -> Result<Redirect, FlowError> {
        let email = EmailAddress::new(&request.email)
            .map_err(|err| FlowError::validation("email", err.to_string()))?;

        if request.token.trim().is_empty() {
            return Err(FlowError::validation("token", "token is required"));
        }

        let check = PasswordPolicy::reset()
            .check(&request.password, &request.password_confirmation);
        if let Some(message) = check.first_message() {
            return Err(FlowError::validation("password", message));
        }

        let token_hash = self.hasher.hash_token(request.token.trim());
        let record = self
            .reset_tokens
            .consume(&email, &token_hash)
            .await?
            .ok_or(FlowError::NotFound)?;

        if record.is_expired() {
            return Err(FlowError::TokenExpired);
        }

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(FlowError::NotFound)?;

        let digest = self
            .hasher
            .hash_password(&request.password)
            .map_err(crypto_failure)?;
        self.users.set_password(user.id, &digest).await?;

        // Invalidate long-lived credentials everywhere else: fresh remember
        // token, and every active session dropped.
        let remember = generate_session_secret()
            .map_err(|err| FlowError::Store(anyhow::anyhow!(err)))?;
        self.users
            .rotate_remember_token(user.id, &self.hasher.hash_token(&remember))
            .await?;
        let revoked = self.sessions.revoke_for_user(user.id).await?;

        info!(user_id = %user.id, revoked_sessions = revoked, "password reset completed");
        Ok(Redirect::Login)
    }

    /// Verify credentials and establish a session. The raw session secret is
    /// returned once in the handle; only its hash is stored.
    pub async fn login(&self, request: LoginRequest) -> Result<SessionHandle, FlowError> {
        let email = EmailAddress::new(&request.email)
            .map_err(|err| FlowError::validation("email", err.to_string()))?;
        if request.password.is_empty() {
            return Err(FlowError::validation("password", "password is required"));
        }

        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                warn!("login attempt for unknown address");
                return Err(FlowError::InvalidCredentials);
            }
        };

        let verified = self
            .hasher
            .verify_password(&request.password, &user.password_hash)
            .map_err(crypto_failure)?;
        if !verified {
            warn!(user_id = %user.id, "login attempt with bad password");
            return Err(FlowError::InvalidCredentials);
        }

        let secret = generate_session_secret()
            .map_err(|err| FlowError::Store(anyhow::anyhow!(err)))?;
        let session = Session::new(
            user.id,
            self.hasher.hash_token(&secret),
            request.remember,
            self.session_config.ttl_for(request.remember),
        );
        self.sessions.insert(session.clone()).await?;

        info!(user_id = %user.id, remember = request.remember, "session established");
        Ok(SessionHandle { session, secret })
    }

    /// Resolve a session secret to its user. Read-only and side-effect-free;
    /// absent, unknown, or expired sessions resolve to `None`.
    pub async fn resolve_session(&self, secret: &str) -> Result<Option<User>, FlowError> {
        if secret.is_empty() {
            return Ok(None);
        }

        let session = match self
            .sessions
            .find_by_hash(&self.hasher.hash_token(secret))
            .await?
        {
            Some(session) if session.is_valid() => session,
            _ => return Ok(None),
        };

        Ok(self.users.find_by_id(session.user_id).await?)
    }

    /// Destroy the session behind a secret. Idempotent: logging out an
    /// already-absent session still redirects to login.
    pub async fn logout(&self, secret: &str) -> Result<Redirect, FlowError> {
        if !secret.is_empty() {
            self.sessions
                .remove_by_hash(&self.hasher.hash_token(secret))
                .await?;
        }
        Ok(Redirect::Login)
    }

    /// Change the password of an authenticated user after verifying the old
    /// one. A mismatch reveals only that the old password doesn't match.
    pub async fn change_password(
        &self,
        user: &User,
        old_password: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), FlowError> {
        if old_password.is_empty() {
            return Err(FlowError::validation("old_password", "old password is required"));
        }
        if new_password.is_empty() {
            return Err(FlowError::validation("new_password", "new password is required"));
        }
        if new_password != confirmation {
            return Err(FlowError::validation(
                "new_password",
                "confirmation does not match",
            ));
        }

        let verified = self
            .hasher
            .verify_password(old_password, &user.password_hash)
            .map_err(crypto_failure)?;
        if !verified {
            return Err(FlowError::InvalidCredentials);
        }

        let digest = self
            .hasher
            .hash_password(new_password)
            .map_err(crypto_failure)?;
        self.users.set_password(user.id, &digest).await?;

        info!(user_id = %user.id, "password changed");
        Ok(())
    }

    /// Update profile fields, storing a new avatar first when one was
    /// uploaded.
    pub async fn edit_profile(
        &self,
        user: &User,
        request: EditProfileRequest,
        avatar: Option<AvatarUpload>,
    ) -> Result<Redirect, FlowError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(FlowError::validation("name", "name is required"));
        }
        let email = EmailAddress::new(&request.email)
            .map_err(|err| FlowError::validation("email", err.to_string()))?;

        let stored_avatar = match avatar {
            Some(upload) => {
                let desired = avatar_file_name(&upload.original_name, chrono::Utc::now())?;
                let stored = self
                    .avatars
                    .store(&upload.bytes, &desired)
                    .await
                    .map_err(FlowError::Store)?;
                Some(stored)
            }
            None => None,
        };

        let updated = self
            .users
            .update_profile(
                user.id,
                ProfileUpdate {
                    email: Some(email),
                    name: Some(name.to_owned()),
                    first_name: request.first_name,
                    last_name: request.last_name,
                    avatar: stored_avatar,
                },
            )
            .await?;

        debug!(user_id = %updated.id, "profile updated");
        Ok(Redirect::Profile)
    }

    /// Read-only projection of the profile page fields.
    pub fn profile(&self, user: &User) -> ProfileView {
        ProfileView::from(user)
    }
}

fn crypto_failure(err: CryptoError) -> FlowError {
    FlowError::Store(anyhow::anyhow!(err))
}
