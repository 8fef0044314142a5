//! Typed access to the three vault keys.
//!
//! `AccountStore` wraps any `KeyValueStore` and (de)serializes the
//! credential, the accounts list and the active account as JSON.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::record::{AccountRecord, ActiveAccountRecord};
use super::store::KeyValueStore;
use crate::crypto::Credential;
use crate::errors::{Result, WalletVaultError};

/// Store key of the master-password credential.
pub const CREDENTIAL_KEY: &str = "credential";

/// Store key of the accounts list.
pub const ACCOUNTS_KEY: &str = "accounts";

/// Store key of the active account.
pub const ACTIVE_ACCOUNT_KEY: &str = "activeAccount";

pub struct AccountStore<S> {
    store: S,
}

impl<S: KeyValueStore> AccountStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying key-value store.
    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn credential(&self) -> Result<Option<Credential>> {
        self.read(CREDENTIAL_KEY)
    }

    pub fn set_credential(&self, credential: &Credential) -> Result<()> {
        self.write(CREDENTIAL_KEY, credential)
    }

    /// All accounts in insertion order.  A missing key is an empty list.
    pub fn accounts(&self) -> Result<Vec<AccountRecord>> {
        Ok(self.read(ACCOUNTS_KEY)?.unwrap_or_default())
    }

    pub fn set_accounts(&self, accounts: &[AccountRecord]) -> Result<()> {
        self.write(ACCOUNTS_KEY, accounts)
    }

    pub fn active_account(&self) -> Result<Option<ActiveAccountRecord>> {
        self.read(ACTIVE_ACCOUNT_KEY)
    }

    pub fn set_active_account(&self, active: &ActiveAccountRecord) -> Result<()> {
        self.write(ACTIVE_ACCOUNT_KEY, active)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.store.get(key)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| WalletVaultError::InvalidRecord {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| WalletVaultError::InvalidRecord {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.store.set(key, &bytes)?;
        Ok(())
    }
}
