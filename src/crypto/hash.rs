//! One-way hashing of the master password.
//!
//! The stored `Credential` is only ever used to answer "is this the
//! right password?".  It is an Argon2id digest over the password with a
//! random per-credential salt, so it cannot be reversed and is not the
//! key that protects any private key (those use their own salts, see
//! `cipher`).

use serde::{Deserialize, Serialize};

use super::encoding::{base64_decode, base64_encode};
use super::kdf::{derive_key_with_params, generate_salt, Argon2Params, KEY_LEN};
use crate::errors::Result;

/// Current credential format version.
pub const CREDENTIAL_VERSION: u8 = 1;

/// The persisted master-password proof.
///
/// Exactly one exists per initialized vault.  Callers treat it as
/// opaque; only `PasswordHasher` and `PasswordVerifier` look inside.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    pub version: u8,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    pub argon2_params: Argon2Params,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub digest: Vec<u8>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("version", &self.version)
            .field("argon2_params", &self.argon2_params)
            .finish_non_exhaustive()
    }
}

/// Produces `Credential`s from plaintext passwords.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher {
    params: Argon2Params,
}

impl PasswordHasher {
    pub fn new(params: Argon2Params) -> Self {
        Self { params }
    }

    /// Hash `password` into a fresh credential with a new random salt.
    ///
    /// An empty password is hashed like any other; rejecting weak
    /// passwords is `PasswordPolicy`'s job.
    pub fn hash(&self, password: &[u8]) -> Result<Credential> {
        let salt = generate_salt();
        let digest = Self::digest(password, &salt, &self.params)?;
        Ok(Credential {
            version: CREDENTIAL_VERSION,
            salt: salt.to_vec(),
            argon2_params: self.params,
            digest: digest.to_vec(),
        })
    }

    /// Deterministic digest of `password` under the given salt and params.
    pub fn digest(password: &[u8], salt: &[u8], params: &Argon2Params) -> Result<[u8; KEY_LEN]> {
        let key = derive_key_with_params(password, salt, params)?;
        Ok(*key.as_bytes())
    }
}
