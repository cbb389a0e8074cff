//! The authorization gate: a pure decision function over graduated access
//! levels.
//!
//! Levels form a closed ordered set (public, authenticated, paid, admin)
//! but the checks are deliberately independent, not hierarchical: the admin
//! level does not re-check the paid level's subscription predicate. The
//! gate takes the resolved identity as an explicit parameter and has no
//! side effects.

use serde::{Deserialize, Serialize};

use crate::domain::user::User;
use crate::error::FlowError;

/// Access tier a request must clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AccessLevel {
    Public = 0,
    Authenticated = 1,
    Paid = 2,
    Admin = 3,
}

impl AccessLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for AccessLevel {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AccessLevel::Public),
            1 => Ok(AccessLevel::Authenticated),
            2 => Ok(AccessLevel::Paid),
            3 => Ok(AccessLevel::Admin),
            other => Err(other),
        }
    }
}

/// Redirect targets the flows and the gate hand back to the host. The host
/// owns the mapping onto actual routes; these paths mirror its defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Redirect {
    Home,
    Login,
    Profile,
    VerificationNotice,
    Subscription,
    Forbidden,
}

impl Redirect {
    pub fn as_path(&self) -> &'static str {
        match self {
            Redirect::Home => "/",
            Redirect::Login => "/login",
            Redirect::Profile => "/profile",
            Redirect::VerificationNotice => "/verify-email",
            Redirect::Subscription => "/subscription",
            Redirect::Forbidden => "/403",
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(Redirect),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Resolve a requested access level against the current identity.
pub fn authorize(level: AccessLevel, user: Option<&User>) -> Decision {
    let user = match user {
        Some(user) => user,
        None if level == AccessLevel::Public => return Decision::Allow,
        None => return Decision::Redirect(Redirect::Login),
    };

    match level {
        AccessLevel::Public | AccessLevel::Authenticated => Decision::Allow,
        AccessLevel::Paid if !user.has_active_subscription() => {
            Decision::Redirect(Redirect::Subscription)
        }
        AccessLevel::Admin if !user.is_admin() => Decision::Redirect(Redirect::Forbidden),
        AccessLevel::Paid | AccessLevel::Admin => Decision::Allow,
    }
}

/// Like [`authorize`], but mapped onto the error taxonomy for callers that
/// gate an operation instead of a page.
pub fn require(level: AccessLevel, user: Option<&User>) -> Result<(), FlowError> {
    match authorize(level, user) {
        Decision::Allow => Ok(()),
        Decision::Redirect(Redirect::Login) => Err(FlowError::Unauthorized),
        Decision::Redirect(Redirect::Subscription) => Err(FlowError::SubscriptionRequired),
        Decision::Redirect(_) => Err(FlowError::Forbidden),
    }
}
