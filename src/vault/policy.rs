//! Accepted format for a new master password.
//!
//! A password must be non-empty and mix character classes: it needs at
//! least one ASCII letter and at least one digit.

use std::fmt;

/// Why a new password was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyViolation {
    Empty,
    MissingLetter,
    MissingDigit,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyViolation::Empty => write!(f, "password cannot be empty"),
            PolicyViolation::MissingLetter => write!(f, "password must contain a letter"),
            PolicyViolation::MissingDigit => write!(f, "password must contain a digit"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordPolicy;

impl PasswordPolicy {
    pub fn check(&self, password: &str) -> Result<(), PolicyViolation> {
        if password.is_empty() {
            return Err(PolicyViolation::Empty);
        }
        if !password.bytes().any(|b| b.is_ascii_alphabetic()) {
            return Err(PolicyViolation::MissingLetter);
        }
        if !password.bytes().any(|b| b.is_ascii_digit()) {
            return Err(PolicyViolation::MissingDigit);
        }
        Ok(())
    }
}
