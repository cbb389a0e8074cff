use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Validated, normalized email address.
///
/// Addresses are trimmed and lowercased on construction so the store's
/// uniqueness index never sees two casings of the same mailbox. The shape
/// check is deliberately loose (one `@`, non-empty local part, dotted
/// domain); deliverability is the notifier's problem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmailError {
    #[error("email address is required")]
    Empty,
    #[error("email address must contain a single @")]
    MissingAtSign,
    #[error("email address has an empty local part")]
    EmptyLocalPart,
    #[error("email address has an invalid domain")]
    InvalidDomain,
}

impl EmailAddress {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, EmailError> {
        let normalized = raw.as_ref().trim().to_lowercase();

        if normalized.is_empty() {
            return Err(EmailError::Empty);
        }

        let mut parts = normalized.splitn(2, '@');
        let local = parts.next().unwrap_or_default();
        let domain = parts.next().ok_or(EmailError::MissingAtSign)?;

        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }

        if domain.contains('@') {
            return Err(EmailError::MissingAtSign);
        }

        if domain.is_empty()
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || domain.contains(char::is_whitespace)
        {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl std::str::FromStr for EmailAddress {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_normalizes() {
        let email = EmailAddress::new("  Alice@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert_eq!(EmailAddress::new(""), Err(EmailError::Empty));
        assert_eq!(EmailAddress::new("alice"), Err(EmailError::MissingAtSign));
        assert_eq!(
            EmailAddress::new("@example.com"),
            Err(EmailError::EmptyLocalPart)
        );
        assert_eq!(
            EmailAddress::new("alice@example"),
            Err(EmailError::InvalidDomain)
        );
        assert_eq!(
            EmailAddress::new("alice@.com"),
            Err(EmailError::InvalidDomain)
        );
        assert_eq!(
            EmailAddress::new("a@b@c.com"),
            Err(EmailError::MissingAtSign)
        );
    }

    #[test]
    fn serde_round_trip_validates() {
        let email: EmailAddress = serde_json::from_str("\"a@x.com\"").unwrap();
        assert_eq!(email.as_str(), "a@x.com");
        assert!(serde_json::from_str::<EmailAddress>("\"nope\"").is_err());
    }
}
