//! Crate-wide error taxonomy for the identity flows.
//!
//! Every user-facing flow recovers its errors locally and translates them to
//! a redirect-with-message at the boundary; only [`FlowError::Store`] is a
//! fatal condition the host should map to a 5xx response.

use thiserror::Error;

use crate::domain::repositories::RepositoryError;

/// Errors surfaced by the registration, verification, reset, login, and
/// profile flows.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A required or malformed input field. Carries field-level detail so the
    /// host can re-render the form with the message attached to the field.
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("email already registered")]
    DuplicateEmail,

    /// Bad login, or a mismatched old password on change-password. The
    /// message never says which check failed beyond that.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token")]
    TokenInvalid,

    /// Unknown user or already-consumed token.
    #[error("not found")]
    NotFound,

    /// Gate failure at the authenticated level.
    #[error("authentication required")]
    Unauthorized,

    /// Gate failure at the admin level.
    #[error("forbidden")]
    Forbidden,

    /// Gate failure at the paid-subscriber level.
    #[error("active subscription required")]
    SubscriptionRequired,

    /// Store connectivity failure. The only variant that should propagate as
    /// a fatal error instead of a user-facing redirect.
    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl FlowError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Whether the host should treat this as a 5xx-class failure rather than
    /// a redirect-with-message.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

impl From<RepositoryError> for FlowError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::EmailExists => Self::DuplicateEmail,
            RepositoryError::Store(inner) => Self::Store(inner),
        }
    }
}
