//! Cryptographic primitives for WalletVault.
//!
//! This module provides:
//! - Argon2id password-based key derivation (`kdf`)
//! - One-way master-password hashing (`hash`)
//! - AES-256-GCM private-key encryption keyed by the password (`cipher`)

pub mod cipher;
pub(crate) mod encoding;
pub mod hash;
pub mod kdf;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{KeyCipher, PasswordHasher, ...};
pub use cipher::KeyCipher;
pub use hash::{Credential, PasswordHasher};
pub use kdf::{derive_key_with_params, generate_salt, Argon2Params};
