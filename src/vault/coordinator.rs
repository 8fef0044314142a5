//! The vault's single writer: master password lifecycle and rekeying.
//!
//! `RekeyCoordinator` is the only component that writes the credential
//! or any `encrypted_private_key`.  Its central operation is
//! `change_password`, which moves through an explicit state machine:
//!
//! ```text
//! Idle -> Verifying -> PolicyCheck -> Rekeying -> Committing -> Done
//!             |             |             |            |
//!             +-------------+-------------+------------+--> Aborted(reason)
//! ```
//!
//! Every record is decrypted and re-encrypted into a staging area before
//! anything is written.  The commit then writes accounts, then the active
//! account, then the credential.  Until the credential write lands, the
//! stored credential still matches the password that decrypts every
//! persisted ciphertext, so a failure before that point leaves a vault
//! that opens with the old password.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use zeroize::Zeroizing;

use super::accounts::{AccountStore, CREDENTIAL_KEY};
use super::policy::{PasswordPolicy, PolicyViolation};
use super::record::{validate_account_name, AccountRecord, ActiveAccountRecord, NewAccount};
use super::store::KeyValueStore;
use super::verifier::{PasswordVerifier, Verification};
use crate::crypto::{Argon2Params, Credential, KeyCipher, PasswordHasher};
use crate::errors::{Result, WalletVaultError};

// ---------------------------------------------------------------------------
// Domain state
// ---------------------------------------------------------------------------

/// Which write failed during the commit phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStage {
    Accounts,
    ActiveAccount,
    Credential,
}

impl fmt::Display for CommitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitStage::Accounts => write!(f, "accounts"),
            CommitStage::ActiveAccount => write!(f, "active account"),
            CommitStage::Credential => write!(f, "credential"),
        }
    }
}

/// Why a password change stopped before `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The old password did not match, or no credential is set.
    Mismatch,
    InvalidNewPassword(PolicyViolation),
    /// A stored record could not be read or decrypted with a verified
    /// old password.  Nothing was written.
    CorruptRecord { record: String },
    /// A write failed mid-commit.  Writes before `stage` have landed.
    PersistFailed { stage: CommitStage, error: String },
}

impl AbortReason {
    /// Short text for the password-change form.
    pub fn user_message(&self) -> &'static str {
        match self {
            AbortReason::Mismatch => "Current password is wrong",
            AbortReason::InvalidNewPassword(_) => {
                "New password must contain both letters and digits"
            }
            AbortReason::CorruptRecord { .. } => {
                "A stored account could not be decrypted; nothing was changed"
            }
            AbortReason::PersistFailed { stage, .. } => match stage {
                CommitStage::Credential => {
                    "Saving failed; stored keys now use the new password but the old password is still required to unlock"
                }
                _ => "Saving failed; the current password still unlocks the vault",
            },
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Mismatch => write!(f, "current password does not match"),
            AbortReason::InvalidNewPassword(v) => write!(f, "invalid new password: {v}"),
            AbortReason::CorruptRecord { record } => write!(f, "corrupt record '{record}'"),
            AbortReason::PersistFailed { stage, error } => {
                write!(f, "failed to persist {stage}: {error}")
            }
        }
    }
}

/// Summary handed to password-changed hooks.  Holds no key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RekeyReport {
    pub accounts_rekeyed: usize,
    pub active_rekeyed: bool,
}

/// States of one password-change transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RekeyState {
    Idle,
    Verifying,
    PolicyCheck,
    Rekeying,
    Committing,
    Done(RekeyReport),
    Aborted(AbortReason),
}

impl RekeyState {
    pub fn name(&self) -> &'static str {
        match self {
            RekeyState::Idle => "idle",
            RekeyState::Verifying => "verifying",
            RekeyState::PolicyCheck => "policy-check",
            RekeyState::Rekeying => "rekeying",
            RekeyState::Committing => "committing",
            RekeyState::Done(_) => "done",
            RekeyState::Aborted(_) => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RekeyState::Done(_) | RekeyState::Aborted(_))
    }
}

/// Terminal result of `change_password`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RekeyOutcome {
    Done(RekeyReport),
    Aborted(AbortReason),
}

impl RekeyOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, RekeyOutcome::Done(_))
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match self {
            RekeyOutcome::Done(_) => None,
            RekeyOutcome::Aborted(reason) => Some(reason),
        }
    }
}

impl From<RekeyOutcome> for RekeyState {
    fn from(outcome: RekeyOutcome) -> Self {
        match outcome {
            RekeyOutcome::Done(report) => RekeyState::Done(report),
            RekeyOutcome::Aborted(reason) => RekeyState::Aborted(reason),
        }
    }
}

/// Callback fired once per successful password change.
pub type PasswordChangedHook = Box<dyn Fn(&RekeyReport) + Send + Sync>;

/// Everything a rekey writes, fully built before the first write.
struct Staged {
    accounts: Vec<AccountRecord>,
    active: Option<ActiveAccountRecord>,
    credential: Credential,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

pub struct RekeyCoordinator<S> {
    store: AccountStore<S>,
    hasher: PasswordHasher,
    cipher: KeyCipher,
    policy: PasswordPolicy,
    hooks: Vec<PasswordChangedHook>,
    /// Serializes mutating operations and key decryption on this vault
    /// instance, so nothing observes a half-committed rekey.
    lock: Mutex<()>,
}

impl<S: KeyValueStore> RekeyCoordinator<S> {
    /// Build a coordinator over an injected store.
    ///
    /// `params` are used for new credentials and new ciphertexts; existing
    /// data is always read with the params stored alongside it.
    pub fn new(store: AccountStore<S>, params: Argon2Params) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            store,
            hasher: PasswordHasher::new(params),
            cipher: KeyCipher::new(params),
            policy: PasswordPolicy,
            hooks: Vec::new(),
            lock: Mutex::new(()),
        })
    }

    /// Read access to the underlying records.
    pub fn store(&self) -> &AccountStore<S> {
        &self.store
    }

    /// Register a hook fired exactly once after each successful
    /// password change (e.g. to refresh cached account lists).
    ///
    /// Hooks run after the vault lock is released and may call back
    /// into the coordinator.
    pub fn on_password_changed<F>(&mut self, hook: F)
    where
        F: Fn(&RekeyReport) + Send + Sync + 'static,
    {
        self.hooks.push(Box::new(hook));
    }

    // ------------------------------------------------------------------
    // Master password
    // ------------------------------------------------------------------

    /// Set the master password of an uninitialized vault.
    pub fn initialize(&self, password: &str) -> Result<()> {
        let _guard = self.acquire();

        if self.store.credential()?.is_some() {
            return Err(WalletVaultError::CredentialAlreadySet);
        }
        self.policy
            .check(password)
            .map_err(|v| WalletVaultError::WeakPassword(v.to_string()))?;

        let credential = self.hasher.hash(password.as_bytes())?;
        self.store.set_credential(&credential)?;
        tracing::info!("master password set");
        Ok(())
    }

    pub fn check_current_password(&self, candidate: &str) -> Result<Verification> {
        PasswordVerifier::verify_against_vault(candidate.as_bytes(), &self.store)
    }

    /// Change the master password, rekeying every stored private key.
    ///
    /// Never retries.  Concurrent calls queue behind each other.
    pub fn change_password(&self, old: &str, new: &str) -> RekeyOutcome {
        let outcome = {
            let _guard = self.acquire();

            let mut state = RekeyState::Idle;
            let outcome = match self.run_rekey(&mut state, old, new) {
                Ok(report) => RekeyOutcome::Done(report),
                Err(reason) => RekeyOutcome::Aborted(reason),
            };
            advance(&mut state, outcome.clone().into());
            outcome
        };

        // The lock is released here; hooks may call back into the vault.
        match &outcome {
            RekeyOutcome::Done(report) => {
                tracing::info!(
                    accounts = report.accounts_rekeyed,
                    active = report.active_rekeyed,
                    "master password changed"
                );
                for hook in &self.hooks {
                    hook(report);
                }
            }
            RekeyOutcome::Aborted(
                reason @ (AbortReason::CorruptRecord { .. } | AbortReason::PersistFailed { .. }),
            ) => tracing::error!(%reason, "password change aborted"),
            RekeyOutcome::Aborted(reason) => tracing::warn!(%reason, "password change aborted"),
        }

        outcome
    }

    fn run_rekey(
        &self,
        state: &mut RekeyState,
        old: &str,
        new: &str,
    ) -> std::result::Result<RekeyReport, AbortReason> {
        // 1. Verify the old password.
        advance(state, RekeyState::Verifying);
        match PasswordVerifier::verify_against_vault(old.as_bytes(), &self.store) {
            Ok(Verification::Matched) => {}
            Ok(Verification::Mismatched | Verification::NoCredentialSet) => {
                return Err(AbortReason::Mismatch);
            }
            Err(e) => {
                tracing::error!(error = %e, "stored credential is unusable");
                return Err(AbortReason::CorruptRecord {
                    record: CREDENTIAL_KEY.to_string(),
                });
            }
        }

        // 2. Check the new password format.
        advance(state, RekeyState::PolicyCheck);
        self.policy
            .check(new)
            .map_err(AbortReason::InvalidNewPassword)?;

        // 3-4. Decrypt everything with the old password and stage the
        //      re-encrypted records.  Nothing is written here.
        advance(state, RekeyState::Rekeying);
        let staged = self.stage(old.as_bytes(), new.as_bytes())?;
        let report = RekeyReport {
            accounts_rekeyed: staged.accounts.len(),
            active_rekeyed: staged.active.is_some(),
        };

        // 5. Commit: accounts, active account, credential.
        advance(state, RekeyState::Committing);
        self.commit(staged)?;

        Ok(report)
    }

    fn stage(&self, old: &[u8], new: &[u8]) -> std::result::Result<Staged, AbortReason> {
        let unreadable = |record: &str, e: WalletVaultError| {
            tracing::error!(record, error = %e, "cannot load record");
            AbortReason::CorruptRecord {
                record: record.to_string(),
            }
        };

        let accounts = self
            .store
            .accounts()
            .map_err(|e| unreadable(super::accounts::ACCOUNTS_KEY, e))?;
        let active = self
            .store
            .active_account()
            .map_err(|e| unreadable(super::accounts::ACTIVE_ACCOUNT_KEY, e))?;

        let mut staged_accounts = Vec::with_capacity(accounts.len());
        for account in accounts {
            let blob = self
                .rekey_blob(&account.encrypted_private_key, old, new)
                .map_err(|e| unreadable(account.name.as_str(), e))?;
            staged_accounts.push(AccountRecord {
                encrypted_private_key: blob,
                ..account
            });
        }

        // The active account carries its own ciphertext, rekeyed on its
        // own even if its name is missing from the accounts list.
        let staged_active = match active {
            Some(active) => {
                if !staged_accounts.iter().any(|a| a.name == active.name()) {
                    tracing::warn!(
                        account = active.name(),
                        "active account is not in the accounts list"
                    );
                }
                let blob = self
                    .rekey_blob(&active.account.encrypted_private_key, old, new)
                    .map_err(|e| unreadable(super::accounts::ACTIVE_ACCOUNT_KEY, e))?;
                Some(ActiveAccountRecord::new(AccountRecord {
                    encrypted_private_key: blob,
                    ..active.account
                }))
            }
            None => None,
        };

        let credential = self
            .hasher
            .hash(new)
            .map_err(|e| unreadable(CREDENTIAL_KEY, e))?;

        Ok(Staged {
            accounts: staged_accounts,
            active: staged_active,
            credential,
        })
    }

    fn commit(&self, staged: Staged) -> std::result::Result<(), AbortReason> {
        let failed = |stage: CommitStage| {
            move |e: WalletVaultError| AbortReason::PersistFailed {
                stage,
                error: e.to_string(),
            }
        };

        self.store
            .set_accounts(&staged.accounts)
            .map_err(failed(CommitStage::Accounts))?;

        if let Some(active) = &staged.active {
            self.store
                .set_active_account(active)
                .map_err(failed(CommitStage::ActiveAccount))?;
        }

        self.store
            .set_credential(&staged.credential)
            .map_err(failed(CommitStage::Credential))?;

        Ok(())
    }

    fn rekey_blob(&self, blob: &[u8], old: &[u8], new: &[u8]) -> Result<Vec<u8>> {
        let plaintext = self.cipher.decrypt(blob, old)?;
        self.cipher.encrypt(&plaintext, new)
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Encrypt and store a new account.
    ///
    /// It becomes the active account when none is active yet or when
    /// `account.activate` is set.
    pub fn add_account(&self, password: &str, account: NewAccount<'_>) -> Result<AccountRecord> {
        let _guard = self.acquire();
        self.require_password(password)?;

        validate_account_name(account.name)?;
        if account.public_key.trim().is_empty() {
            return Err(WalletVaultError::InvalidAccount(
                "public key cannot be empty".into(),
            ));
        }
        if account.private_key.is_empty() {
            return Err(WalletVaultError::InvalidAccount(
                "private key cannot be empty".into(),
            ));
        }

        let mut accounts = self.store.accounts()?;
        if accounts.iter().any(|a| a.name == account.name) {
            return Err(WalletVaultError::AccountAlreadyExists(account.name.to_string()));
        }

        let record = AccountRecord {
            name: account.name.to_string(),
            network: account.network.to_string(),
            encrypted_private_key: self.cipher.encrypt(account.private_key, password.as_bytes())?,
            public_key: account.public_key.to_string(),
            created_at: Utc::now(),
        };
        accounts.push(record.clone());
        self.store.set_accounts(&accounts)?;

        if account.activate || self.store.active_account()?.is_none() {
            self.store
                .set_active_account(&ActiveAccountRecord::new(record.clone()))?;
        }

        tracing::info!(account = %record.name, network = %record.network, "account added");
        Ok(record)
    }

    /// Make an existing account the active one.
    pub fn use_account(&self, name: &str) -> Result<ActiveAccountRecord> {
        let _guard = self.acquire();

        let record = self
            .store
            .accounts()?
            .into_iter()
            .find(|a| a.name == name)
            .ok_or_else(|| WalletVaultError::AccountNotFound(name.to_string()))?;

        let active = ActiveAccountRecord::new(record);
        self.store.set_active_account(&active)?;
        tracing::info!(account = name, "active account changed");
        Ok(active)
    }

    /// Decrypt one account's private key after checking the password.
    pub fn reveal_private_key(&self, password: &str, name: &str) -> Result<Zeroizing<Vec<u8>>> {
        let _guard = self.acquire();
        self.require_password(password)?;

        let record = self
            .store
            .accounts()?
            .into_iter()
            .find(|a| a.name == name)
            .ok_or_else(|| WalletVaultError::AccountNotFound(name.to_string()))?;

        self.cipher
            .decrypt(&record.encrypted_private_key, password.as_bytes())
    }

    /// Whether an active account exists and `password` unlocks its key.
    pub fn is_active_authenticated(&self, password: &str) -> Result<bool> {
        let _guard = self.acquire();
        let Some(active) = self.store.active_account()? else {
            return Ok(false);
        };
        match self
            .cipher
            .decrypt(&active.account.encrypted_private_key, password.as_bytes())
        {
            Ok(_) => Ok(true),
            Err(WalletVaultError::DecryptionFailed) => Ok(false),
            Err(e) => Err(e),
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn require_password(&self, password: &str) -> Result<()> {
        match self.check_current_password(password)? {
            Verification::Matched => Ok(()),
            Verification::Mismatched => Err(WalletVaultError::WrongPassword),
            Verification::NoCredentialSet => Err(WalletVaultError::NoCredentialSet),
        }
    }

    fn acquire(&self) -> MutexGuard<'_, ()> {
        // The mutex guards no data, so a poisoned lock is still usable.
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn advance(state: &mut RekeyState, next: RekeyState) {
    tracing::debug!(from = state.name(), to = next.name(), "rekey state");
    *state = next;
}
