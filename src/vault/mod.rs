//! Vault module: the wallet's encrypted account storage.
//!
//! This module provides:
//! - `AccountRecord` and `ActiveAccountRecord` types (`record`)
//! - The injected key-value storage primitive and its backends (`store`)
//! - Typed access to credential, accounts and active account (`accounts`)
//! - Master-password verification (`verifier`) and new-password policy (`policy`)
//! - `RekeyCoordinator`, the only writer of key material (`coordinator`)

pub mod accounts;
pub mod coordinator;
pub mod policy;
pub mod record;
pub mod store;
pub mod verifier;

// Re-export the most commonly used items.
pub use accounts::AccountStore;
pub use coordinator::{
    AbortReason, CommitStage, RekeyCoordinator, RekeyOutcome, RekeyReport, RekeyState,
};
pub use policy::{PasswordPolicy, PolicyViolation};
pub use record::{AccountRecord, ActiveAccountRecord, NewAccount};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use verifier::{PasswordVerifier, Verification};
