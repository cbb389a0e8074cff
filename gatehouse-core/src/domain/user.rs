//! Core user record and the closed role/subscription sets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::email::EmailAddress;

/// User role. A closed set; the authorization gate compares against the
/// typed value, never a string lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("invalid role: {}", s)),
        }
    }
}

/// Subscription state consulted by the paid access tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Never subscribed.
    #[default]
    None,
    Active,
    Expired,
}

impl SubscriptionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

/// A registered account.
///
/// The password digest and remember token are credentials, not profile data;
/// they are skipped during serialization so the record can be handed to a
/// renderer without leaking either.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Globally unique, normalized address.
    pub email: EmailAddress,
    /// Display name.
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Argon2id PHC string. Never serialized, never logged.
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    /// Set once the verification token is fulfilled; `None` means unverified.
    pub email_verified_at: Option<DateTime<Utc>>,
    pub subscription: SubscriptionStatus,
    /// Stored avatar reference, when one has been uploaded.
    pub avatar: Option<String>,
    /// Long-lived login credential, rotated on password reset. Hashed like
    /// any other bearer secret before it reaches a store.
    #[serde(skip)]
    pub remember_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh, unverified member account.
    pub fn register(email: EmailAddress, name: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            email,
            name,
            first_name: None,
            last_name: None,
            password_hash,
            role: Role::Member,
            email_verified_at: None,
            subscription: SubscriptionStatus::None,
            avatar: None,
            remember_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_verified_email(&self) -> bool {
        self.email_verified_at.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn has_active_subscription(&self) -> bool {
        self.subscription.is_active()
    }
}

/// Partial profile update applied by the edit-profile flow. `None` fields
/// are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<EmailAddress>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
}

/// Read-only projection of the fields the profile page renders.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
}

impl From<&User> for ProfileView {
    fn from(user: &User) -> Self {
        Self {
            username: user.name.clone(),
            email: user.email.as_str().to_owned(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}
