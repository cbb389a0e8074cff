//! Password acceptance rules.
//!
//! Registration and reset carry different minimum lengths (6 and 8); both
//! require the confirmation field to match. The check reports every failed
//! rule so the host can surface them together.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: u16,
}

impl PasswordPolicy {
    /// Policy applied when an account is created.
    pub fn registration() -> Self {
        Self { min_length: 6 }
    }

    /// Stricter policy applied when a password is reset via email.
    pub fn reset() -> Self {
        Self { min_length: 8 }
    }

    /// Evaluate a password and its confirmation, returning the failed rules.
    pub fn check(&self, password: &str, confirmation: &str) -> PasswordCheck {
        let mut failures = Vec::new();

        if password.chars().count() < self.min_length as usize {
            failures.push(PasswordRule::MinLength(self.min_length));
        }

        if password != confirmation {
            failures.push(PasswordRule::Confirmation);
        }

        PasswordCheck { failures }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordRule {
    MinLength(u16),
    Confirmation,
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinLength(len) => {
                write!(f, "must be at least {} characters", len)
            }
            Self::Confirmation => write!(f, "confirmation does not match"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCheck {
    pub failures: Vec<PasswordRule>,
}

impl PasswordCheck {
    pub fn is_satisfied(&self) -> bool {
        self.failures.is_empty()
    }

    /// First failure rendered for a field-level validation message.
    pub fn first_message(&self) -> Option<String> {
        self.failures.first().map(|rule| rule.to_string())
    }
}
