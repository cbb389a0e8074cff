//! Capabilities the flows consume but do not own.
//!
//! Delivery and storage are the host's concern; the core decides only what
//! to send and what a stored avatar may be called.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::email::EmailAddress;
use crate::domain::user::User;
use crate::error::FlowError;

/// Outbound notification sender. Fire-and-forget from the flows'
/// perspective: implementations log delivery failures, the flows never see
/// them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_verification_email(&self, user: &User, token: &str);

    async fn send_password_reset_email(&self, email: &EmailAddress, token: &str);
}

/// Avatar blob storage. The core passes the blob through and owns only the
/// naming policy.
#[async_trait]
pub trait AvatarStore: Send + Sync {
    /// Persist the blob under the desired name, returning the stored
    /// reference to record on the profile.
    async fn store(&self, blob: &[u8], desired_name: &str) -> Result<String, anyhow::Error>;
}

/// An uploaded avatar as received from the host's multipart layer.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub bytes: Vec<u8>,
    /// Original client-side file name; only its extension survives.
    pub original_name: String,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "svg"];

/// Desired stored name for an avatar: upload timestamp plus the original
/// extension. Non-image extensions are rejected before any storage call.
pub fn avatar_file_name(
    original_name: &str,
    uploaded_at: DateTime<Utc>,
) -> Result<String, FlowError> {
    let extension = original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| {
            FlowError::validation("avatar", "must be a jpg, jpeg, png, gif, or svg image")
        })?;

    Ok(format!("{}.{}", uploaded_at.timestamp(), extension))
}
