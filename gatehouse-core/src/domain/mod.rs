//! Domain types: the user record, validated email addresses, and the
//! persistence ports the flows are written against.

pub mod email;
pub mod repositories;
pub mod user;

pub use email::{EmailAddress, EmailError};
pub use repositories::{
    RepositoryError, ResetTokenRepository, SessionRepository, UserRepository,
};
pub use user::{ProfileUpdate, ProfileView, Role, SubscriptionStatus, User};
