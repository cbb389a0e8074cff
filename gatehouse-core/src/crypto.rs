//! Credential hashing primitives shared by the identity flows.
//!
//! Two primitives live here:
//! - Argon2id for password digests, salted per hash and peppered with a
//!   server-side secret.
//! - HMAC-SHA-256 for hashing opaque bearer secrets (session and reset
//!   tokens) before they reach a store, so a leaked table never contains a
//!   usable credential.

use argon2::{
    Algorithm, Argon2, Params, ParamsBuilder, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use hmac::{Hmac, Mac};
use password_hash::Error as PasswordHashError;
use rand::{TryRngCore, rngs::OsRng};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("password pepper must not be empty")]
    EmptyPepper,
    #[error("token HMAC key must not be empty")]
    EmptyTokenKey,
    #[error("invalid Argon2 parameters: {0}")]
    InvalidParams(String),
    #[error("password hashing error: {0}")]
    Hash(String),
}

impl From<PasswordHashError> for CryptoError {
    fn from(err: PasswordHashError) -> Self {
        CryptoError::Hash(err.to_string())
    }
}

/// One-way credential transform used by every flow that touches a password
/// or persists a bearer token.
#[derive(Debug)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    pepper: Zeroizing<Vec<u8>>,
    token_key: Zeroizing<Vec<u8>>,
}

impl CredentialHasher {
    // 19 MiB / 2 iterations matches the OWASP baseline for interactive
    // logins; registration and login both sit on the request path.
    const DEFAULT_MEMORY_KIB: u32 = 19 * 1024;
    const DEFAULT_ITERATIONS: u32 = 2;
    const DEFAULT_PARALLELISM: u32 = 1;
    const SALT_LENGTH: usize = password_hash::Salt::RECOMMENDED_LENGTH;

    pub fn new(
        pepper: impl AsRef<[u8]>,
        token_key: impl AsRef<[u8]>,
    ) -> Result<Self, CryptoError> {
        let params = ParamsBuilder::new()
            .m_cost(Self::DEFAULT_MEMORY_KIB)
            .t_cost(Self::DEFAULT_ITERATIONS)
            .p_cost(Self::DEFAULT_PARALLELISM)
            .output_len(32)
            .build()
            .map_err(|err| CryptoError::InvalidParams(err.to_string()))?;
        Self::with_params(pepper, token_key, params)
    }

    /// Caller-specified Argon2 parameters, mainly for tests that want a
    /// cheap configuration.
    pub fn with_params(
        pepper: impl AsRef<[u8]>,
        token_key: impl AsRef<[u8]>,
        params: Params,
    ) -> Result<Self, CryptoError> {
        let pepper = pepper.as_ref();
        if pepper.is_empty() {
            return Err(CryptoError::EmptyPepper);
        }

        let token_key = token_key.as_ref();
        if token_key.is_empty() {
            return Err(CryptoError::EmptyTokenKey);
        }

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::default(), params),
            pepper: Zeroizing::new(pepper.to_vec()),
            token_key: Zeroizing::new(token_key.to_vec()),
        })
    }

    /// Hash a plaintext password into a PHC string suitable for storage.
    pub fn hash_password(&self, password: &str) -> Result<String, CryptoError> {
        let material = self.peppered(password);

        let mut salt_bytes = [0u8; Self::SALT_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|err| CryptoError::Hash(err.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes)?;

        Ok(self.argon2.hash_password(&material, &salt)?.to_string())
    }

    /// Verify a plaintext password against a stored PHC digest. The Argon2
    /// comparison is constant-time over the digest.
    pub fn verify_password(
        &self,
        password: &str,
        digest: &str,
    ) -> Result<bool, CryptoError> {
        let parsed = PasswordHash::new(digest)?;
        let material = self.peppered(password);
        Ok(self.argon2.verify_password(&material, &parsed).is_ok())
    }

    /// HMAC-SHA-256 digest of an opaque bearer secret, hex-encoded for
    /// storage. Stores index sessions and reset tokens by this value only.
    pub fn hash_token(&self, secret: &str) -> String {
        type HmacSha256 = Hmac<Sha256>;

        let mut mac = HmacSha256::new_from_slice(&self.token_key)
            .expect("HMAC-SHA-256 accepts keys of any size");
        mac.update(secret.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn peppered(&self, password: &str) -> Zeroizing<Vec<u8>> {
        let mut material =
            Zeroizing::new(Vec::with_capacity(password.len() + self.pepper.len()));
        material.extend_from_slice(password.as_bytes());
        material.extend_from_slice(&self.pepper);
        material
    }
}
