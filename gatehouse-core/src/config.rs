//! Environment-driven configuration.
//!
//! Secrets resolve from the environment first, then from a `*_FILE` path
//! (container secret mounts), and are required. Durations accept humantime
//! strings such as `24h` or `30d` and fall back to sensible defaults.

use std::{fs, path::Path};

use chrono::Duration;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::session::SessionConfig;

const PEPPER_VAR: &str = "GATEHOUSE_PASSWORD_PEPPER";
const TOKEN_KEY_VAR: &str = "GATEHOUSE_TOKEN_HMAC_KEY";
const SIGNING_SECRET_VAR: &str = "GATEHOUSE_VERIFICATION_SECRET";
const SESSION_TTL_VAR: &str = "GATEHOUSE_SESSION_TTL";
const REMEMBER_TTL_VAR: &str = "GATEHOUSE_REMEMBER_TTL";
const VERIFICATION_TTL_VAR: &str = "GATEHOUSE_VERIFICATION_TTL";
const RESET_TTL_VAR: &str = "GATEHOUSE_RESET_TTL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required secret {name} (set {name} or {name}_FILE)")]
    MissingSecret { name: &'static str },

    #[error("failed to read secret file for {name}: {source}")]
    SecretFile {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid duration in {name}: {source}")]
    InvalidDuration {
        name: &'static str,
        #[source]
        source: humantime::DurationError,
    },

    #[error("duration in {name} is out of range")]
    DurationOutOfRange { name: &'static str },
}

/// Resolved configuration for the identity core.
pub struct GatehouseConfig {
    /// Server-side pepper mixed into every password digest.
    pub password_pepper: Zeroizing<String>,
    /// HMAC key for hashing bearer secrets before persistence.
    pub token_hmac_key: Zeroizing<String>,
    /// HS256 signing secret for verification tokens.
    pub verification_secret: Zeroizing<String>,
    pub session: SessionConfig,
    /// Validity window of a verification email link.
    pub verification_ttl: Duration,
    /// Validity window of a password-reset token.
    pub reset_ttl: Duration,
}

impl std::fmt::Debug for GatehouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatehouseConfig")
            .field("session", &self.session)
            .field("verification_ttl", &self.verification_ttl)
            .field("reset_ttl", &self.reset_ttl)
            .finish_non_exhaustive()
    }
}

impl GatehouseConfig {
    /// Load from the process environment, reading a `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            password_pepper: required_secret(PEPPER_VAR)?,
            token_hmac_key: required_secret(TOKEN_KEY_VAR)?,
            verification_secret: required_secret(SIGNING_SECRET_VAR)?,
            session: SessionConfig {
                session_ttl: duration_or(SESSION_TTL_VAR, Duration::hours(24))?,
                remember_ttl: duration_or(REMEMBER_TTL_VAR, Duration::days(30))?,
            },
            verification_ttl: duration_or(VERIFICATION_TTL_VAR, Duration::minutes(60))?,
            reset_ttl: duration_or(RESET_TTL_VAR, Duration::minutes(60))?,
        })
    }

    /// Fixed secrets and default TTLs, for tests and local tooling.
    pub fn for_tests(secret: &str) -> Self {
        Self {
            password_pepper: Zeroizing::new(secret.to_owned()),
            token_hmac_key: Zeroizing::new(secret.to_owned()),
            verification_secret: Zeroizing::new(secret.to_owned()),
            session: SessionConfig::default(),
            verification_ttl: Duration::minutes(60),
            reset_ttl: Duration::minutes(60),
        }
    }
}

fn required_secret(name: &'static str) -> Result<Zeroizing<String>, ConfigError> {
    if let Ok(value) = std::env::var(name)
        && !value.trim().is_empty()
    {
        return Ok(Zeroizing::new(value));
    }

    if let Ok(path) = std::env::var(format!("{name}_FILE"))
        && let Some(secret) = read_secret_file(name, Path::new(&path))?
    {
        return Ok(Zeroizing::new(secret));
    }

    Err(ConfigError::MissingSecret { name })
}

fn read_secret_file(
    name: &'static str,
    path: &Path,
) -> Result<Option<String>, ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|source| ConfigError::SecretFile { name, source })?;
    let trimmed = contents.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_owned()))
}

fn duration_or(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let raw = match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => return Ok(default),
    };

    let parsed = humantime::parse_duration(raw.trim())
        .map_err(|source| ConfigError::InvalidDuration { name, source })?;

    Duration::from_std(parsed).map_err(|_| ConfigError::DurationOutOfRange { name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_carries_defaults() {
        let config = GatehouseConfig::for_tests("secret");
        assert_eq!(config.verification_ttl, Duration::minutes(60));
        assert_eq!(config.session.session_ttl, Duration::hours(24));
        assert_eq!(config.session.remember_ttl, Duration::days(30));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = GatehouseConfig::for_tests("super-secret-pepper");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret-pepper"));
    }
}
