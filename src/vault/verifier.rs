//! Master-password verification.
//!
//! A mismatch is an ordinary answer, returned as `Verification::Mismatched`.
//! `Err` is reserved for faults such as an unreadable store or a
//! credential with unusable KDF parameters.

use subtle::ConstantTimeEq;

use super::accounts::AccountStore;
use super::store::KeyValueStore;
use crate::crypto::{Credential, PasswordHasher};
use crate::errors::Result;

/// Result of checking a candidate password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Matched,
    Mismatched,
    /// The vault has no credential yet.
    NoCredentialSet,
}

impl Verification {
    pub fn is_matched(self) -> bool {
        self == Verification::Matched
    }

    /// Short text for a status line next to a password field.
    pub fn user_message(self) -> &'static str {
        match self {
            Verification::Matched => "Password verified",
            Verification::Mismatched => "Wrong password",
            Verification::NoCredentialSet => "No master password set",
        }
    }
}

pub struct PasswordVerifier;

impl PasswordVerifier {
    /// Compare `candidate` against a stored credential in constant time.
    pub fn verify(candidate: &[u8], credential: &Credential) -> Result<Verification> {
        let digest = PasswordHasher::digest(candidate, &credential.salt, &credential.argon2_params)?;

        // Length is public (always 32 for a well-formed credential);
        // `ct_eq` returns false on a length difference.
        if bool::from(digest[..].ct_eq(&credential.digest)) {
            Ok(Verification::Matched)
        } else {
            Ok(Verification::Mismatched)
        }
    }

    /// Like `verify`, but reads the credential from the vault first.
    pub fn verify_against_vault<S: KeyValueStore>(
        candidate: &[u8],
        store: &AccountStore<S>,
    ) -> Result<Verification> {
        match store.credential()? {
            Some(credential) => Self::verify(candidate, &credential),
            None => Ok(Verification::NoCredentialSet),
        }
    }
}
