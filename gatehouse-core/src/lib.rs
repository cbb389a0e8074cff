//! Identity lifecycle and tiered access control.
//!
//! This crate owns the authorization and credential-lifecycle state machine
//! of a web application: account creation, email-ownership proof, password
//! reset, session establishment, and a graduated authorization gate over
//! four access levels (public, authenticated, paid subscriber, admin).
//!
//! ## Architecture
//!
//! - [`domain`] holds the user record, validated email addresses, and the
//!   persistence ports ([`domain::UserRepository`] and friends).
//! - [`crypto`] concentrates the hashing primitives: Argon2id for
//!   passwords, HMAC-SHA-256 for bearer secrets headed to a store.
//! - [`token`] issues the two token kinds: stateless signed verification
//!   tokens and stateful single-use reset tokens.
//! - [`gate`] is the pure decision function mapping (level, identity) to
//!   allow-or-redirect.
//! - [`flows`] orchestrates everything into the user-facing flows via
//!   [`flows::IdentityService`].
//! - [`infrastructure`] ships in-memory reference stores that honor the
//!   ports' atomicity contracts.
//!
//! HTTP routing, template rendering, and durable storage are the host's
//! concern; the flows return [`gate::Redirect`] values and structured
//! errors ([`error::FlowError`]) for the host to translate.

pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod flows;
pub mod gate;
pub mod infrastructure;
pub mod policy;
pub mod session;
pub mod token;

pub use config::{ConfigError, GatehouseConfig};
pub use crypto::{CredentialHasher, CryptoError};
pub use domain::{
    EmailAddress, ProfileUpdate, ProfileView, RepositoryError, ResetTokenRepository,
    Role, SessionRepository, SubscriptionStatus, User, UserRepository,
};
pub use error::FlowError;
pub use flows::{
    AvatarStore, AvatarUpload, EditProfileRequest, IdentityService, LoginRequest,
    Notifier, RegisterRequest, ResendOutcome, ResetPasswordRequest,
};
pub use gate::{AccessLevel, Decision, Redirect, authorize, require};
pub use policy::PasswordPolicy;
pub use session::{Session, SessionConfig, SessionHandle};
pub use token::{ResetToken, ResetTokenRecord, VerificationTokenIssuer};
