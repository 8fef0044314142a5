//! Password-keyed AES-256-GCM encryption of private-key material.
//!
//! Every call to `encrypt` draws a fresh Argon2id salt and a fresh
//! 12-byte nonce, so encrypting the same key under the same password
//! twice gives unrelated blobs.  The blob carries everything `decrypt`
//! needs besides the password:
//!
//! ```text
//! [ version: 1 | m_kib: u32 LE | t: u32 LE | p: u32 LE | salt: 32 | nonce: 12 | ciphertext + 16-byte tag ]
//! ```
//!
//! Everything before the nonce is the header.  It is passed to AES-GCM
//! as associated data, so editing the KDF parameters or the salt makes
//! authentication fail just like editing the ciphertext does.

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use zeroize::Zeroizing;

use super::kdf::{derive_key_with_params, generate_salt, Argon2Params, SALT_LEN};
use crate::errors::{Result, WalletVaultError};

/// Current blob format version.
pub const BLOB_VERSION: u8 = 1;

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
const TAG_LEN: usize = 16;

/// version (1) + three u32 KDF params (12) + salt.
const HEADER_LEN: usize = 1 + 12 + SALT_LEN;

/// Encrypts and decrypts private keys under the master password.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCipher {
    params: Argon2Params,
}

impl KeyCipher {
    /// `params` only affects new blobs; `decrypt` reads them from the blob.
    pub fn new(params: Argon2Params) -> Self {
        Self { params }
    }

    /// Encrypt `plaintext_key` under `password`.
    pub fn encrypt(&self, plaintext_key: &[u8], password: &[u8]) -> Result<Vec<u8>> {
        let salt = generate_salt();
        let header = encode_header(&self.params, &salt);

        let key = derive_key_with_params(password, &salt, &self.params)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| WalletVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext_key,
                    aad: &header,
                },
            )
            .map_err(|e| WalletVaultError::EncryptionFailed(format!("encryption error: {e}")))?;

        let mut output = Vec::with_capacity(HEADER_LEN + NONCE_LEN + ciphertext.len());
        output.extend_from_slice(&header);
        output.extend_from_slice(&nonce);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    /// Decrypt a blob produced by `encrypt`.
    ///
    /// Any problem (wrong password, truncation, tampering, unknown
    /// version, unusable KDF params) yields `DecryptionFailed`.
    pub fn decrypt(&self, blob: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if blob.len() < HEADER_LEN + NONCE_LEN + TAG_LEN {
            return Err(WalletVaultError::DecryptionFailed);
        }

        let (header, rest) = blob.split_at(HEADER_LEN);
        let (params, salt) = decode_header(header)?;
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

        let key = derive_key_with_params(password, salt, &params)
            .map_err(|_| WalletVaultError::DecryptionFailed)?;
        let cipher =
            Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| WalletVaultError::DecryptionFailed)?;

        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: header,
                },
            )
            .map_err(|_| WalletVaultError::DecryptionFailed)?;

        Ok(Zeroizing::new(plaintext))
    }
}

fn encode_header(params: &Argon2Params, salt: &[u8; SALT_LEN]) -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.push(BLOB_VERSION);
    header.extend_from_slice(&params.memory_kib.to_le_bytes());
    header.extend_from_slice(&params.iterations.to_le_bytes());
    header.extend_from_slice(&params.parallelism.to_le_bytes());
    header.extend_from_slice(salt);
    header
}

fn decode_header(header: &[u8]) -> Result<(Argon2Params, &[u8])> {
    if header.len() != HEADER_LEN || header[0] != BLOB_VERSION {
        return Err(WalletVaultError::DecryptionFailed);
    }

    let read_u32 = |at: usize| -> Result<u32> {
        header[at..at + 4]
            .try_into()
            .map(u32::from_le_bytes)
            .map_err(|_| WalletVaultError::DecryptionFailed)
    };

    let params = Argon2Params {
        memory_kib: read_u32(1)?,
        iterations: read_u32(5)?,
        parallelism: read_u32(9)?,
    };
    params
        .validate()
        .map_err(|_| WalletVaultError::DecryptionFailed)?;

    Ok((params, &header[13..]))
}
