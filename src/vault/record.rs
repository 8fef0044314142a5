//! Account records persisted by the vault.
//!
//! `encrypted_private_key` always holds a `KeyCipher` blob produced under
//! the current master password.  It is serialized as a base64 string
//! under the JSON name `privateKey`, next to `publicKey`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::encoding::{base64_decode, base64_encode};

/// One wallet identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    /// Unique display name (e.g. "main").
    pub name: String,

    /// Network identifier the account belongs to (e.g. "mainnet").
    pub network: String,

    #[serde(
        rename = "privateKey",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub encrypted_private_key: Vec<u8>,

    pub public_key: String,

    /// Missing in records written by older versions.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountRecord")
            .field("name", &self.name)
            .field("network", &self.network)
            .field("public_key", &self.public_key)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// The account currently in use.
///
/// Persisted separately from the accounts list with its own copy of
/// the ciphertext, which must be rekeyed in lock-step with the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveAccountRecord {
    pub account: AccountRecord,
}

impl ActiveAccountRecord {
    pub fn new(account: AccountRecord) -> Self {
        Self { account }
    }

    pub fn name(&self) -> &str {
        &self.account.name
    }
}

/// Input for `RekeyCoordinator::add_account`.
#[derive(Clone, Copy)]
pub struct NewAccount<'a> {
    pub name: &'a str,
    pub network: &'a str,
    pub public_key: &'a str,
    pub private_key: &'a [u8],
    /// Make this the active account even if another one is active.
    pub activate: bool,
}

/// Validate an account name.
///
/// Allowed: any printable characters except control characters.
/// Must be non-empty after trimming and at most 64 characters.
pub fn validate_account_name(name: &str) -> crate::errors::Result<()> {
    use crate::errors::WalletVaultError;

    if name.trim().is_empty() {
        return Err(WalletVaultError::InvalidAccount(
            "account name cannot be empty".into(),
        ));
    }
    if name.chars().count() > 64 {
        return Err(WalletVaultError::InvalidAccount(
            "account name cannot exceed 64 characters".into(),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(WalletVaultError::InvalidAccount(format!(
            "account name '{}' contains control characters",
            name.escape_debug()
        )));
    }
    Ok(())
}
