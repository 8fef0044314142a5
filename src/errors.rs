use thiserror::Error;

use crate::vault::store::StoreError;

/// All errors that can occur in WalletVault.
///
/// The outcome of a password change is not reported through this type:
/// `RekeyCoordinator::change_password` returns a `RekeyOutcome` value.
#[derive(Debug, Error)]
pub enum WalletVaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong password or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault errors ---
    #[error("No master password set — run `walletvault init` first")]
    NoCredentialSet,

    #[error("A master password is already set for this vault")]
    CredentialAlreadySet,

    #[error("Wrong password")]
    WrongPassword,

    #[error("Password does not meet the policy: {0}")]
    WeakPassword(String),

    #[error("Account '{0}' not found")]
    AccountNotFound(String),

    #[error("Account '{0}' already exists")]
    AccountAlreadyExists(String),

    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    #[error("Invalid record '{key}': {reason}")]
    InvalidRecord { key: String, reason: String },

    // --- Store errors ---
    #[error(transparent)]
    Store(#[from] StoreError),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Password mismatch — passwords do not match")]
    PasswordMismatch,

    #[error("Password change aborted: {0}")]
    RekeyAborted(String),

    #[error("Audit error: {0}")]
    AuditError(String),
}

/// Convenience type alias for WalletVault results.
pub type Result<T> = std::result::Result<T, WalletVaultError>;
