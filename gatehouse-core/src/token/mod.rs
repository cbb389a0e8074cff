//! Token issuance: stateless signed verification tokens and stateful
//! single-use reset tokens, each with its own validity policy.

pub mod reset;
pub mod verification;

pub use reset::{ResetToken, ResetTokenError, ResetTokenRecord};
pub use verification::{VerificationTokenError, VerificationTokenIssuer};
