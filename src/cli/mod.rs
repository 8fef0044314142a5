//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{Result, WalletVaultError};
use crate::vault::{AccountStore, FileStore, RekeyCoordinator};

/// Environment variable holding the current master password.
pub const PASSWORD_ENV: &str = "WALLETVAULT_PASSWORD";

/// Environment variable holding the new master password.
pub const NEW_PASSWORD_ENV: &str = "WALLETVAULT_NEW_PASSWORD";

/// Environment variable holding a private key for `account add`.
pub const PRIVATE_KEY_ENV: &str = "WALLETVAULT_PRIVATE_KEY";

/// WalletVault CLI: password-protected key vault for wallet accounts.
#[derive(Parser)]
#[command(
    name = "walletvault",
    about = "Password-protected key vault for wallet accounts",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store directory (default: `store_dir` from .walletvault.toml, or .walletvault)
    #[arg(long, global = true)]
    pub store_dir: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Set the master password of a new vault
    Init,

    /// Check a password against the stored master password
    Check,

    /// Change the master password and re-encrypt every account key
    ChangePassword,

    /// Manage wallet accounts (add, list, use)
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Show vault and active-account status
    Status {
        /// Also check that the password unlocks the active account
        #[arg(long)]
        unlock: bool,
    },

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Account subcommands.
#[derive(clap::Subcommand)]
pub enum AccountAction {
    /// Add an account (private key read from a hidden prompt)
    Add {
        /// Account name
        name: String,
        /// Network identifier (e.g. mainnet)
        #[arg(short, long)]
        network: String,
        /// Public key of the account
        #[arg(short, long)]
        public_key: String,
        /// Make it the active account
        #[arg(long)]
        activate: bool,
    },

    /// List all accounts
    List,

    /// Switch the active account
    Use {
        /// Account name
        name: String,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolved settings and paths for one command invocation.
#[derive(Clone)]
pub struct Context {
    pub store_dir: PathBuf,
    pub settings: Settings,
}

impl Context {
    /// Load `.walletvault.toml` from the working directory and apply
    /// the `--store-dir` override.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let settings = Settings::load(&cwd)?;
        let store_dir = settings.store_path(&cwd, cli.store_dir.as_deref());
        Ok(Self {
            store_dir,
            settings,
        })
    }

    /// Build the vault coordinator over the file store.
    pub fn open_vault(&self) -> Result<RekeyCoordinator<FileStore>> {
        let store = AccountStore::new(FileStore::new(&self.store_dir));
        RekeyCoordinator::new(store, self.settings.argon2_params())
    }

    /// Record an operation in the audit log (no-op without `audit-log`).
    pub fn audit(&self, op: &str, account: Option<&str>, details: Option<&str>) {
        #[cfg(feature = "audit-log")]
        crate::audit::log_audit(&self.store_dir, op, account, details);

        #[cfg(not(feature = "audit-log"))]
        let _ = (op, account, details);
    }
}

/// Get the current master password.
///
/// Checks `WALLETVAULT_PASSWORD` first (scripted use), then prompts.
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(Zeroizing::new(pw));
    }

    let pw = dialoguer::Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()
        .map_err(|e| WalletVaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password and its repetition.
///
/// `env_var` lets scripts skip the prompt.  A repetition that does not
/// match is an error; the format policy is enforced by the vault.
pub fn prompt_new_password(env_var: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(env_var) {
        return Ok(Zeroizing::new(pw));
    }

    let password = Zeroizing::new(
        dialoguer::Password::new()
            .with_prompt("New password")
            .interact()
            .map_err(|e| WalletVaultError::CommandFailed(format!("password prompt: {e}")))?,
    );
    let repeated = Zeroizing::new(
        dialoguer::Password::new()
            .with_prompt("Repeat new password")
            .interact()
            .map_err(|e| WalletVaultError::CommandFailed(format!("password prompt: {e}")))?,
    );

    check_repeated(&password, &repeated)?;
    Ok(password)
}

/// Read a private key from `WALLETVAULT_PRIVATE_KEY` or a hidden prompt.
pub fn prompt_private_key() -> Result<Zeroizing<String>> {
    if let Ok(key) = std::env::var(PRIVATE_KEY_ENV) {
        return Ok(Zeroizing::new(key));
    }

    let key = dialoguer::Password::new()
        .with_prompt("Private key")
        .interact()
        .map_err(|e| WalletVaultError::CommandFailed(format!("private key prompt: {e}")))?;
    Ok(Zeroizing::new(key))
}

fn check_repeated(password: &str, repeated: &str) -> Result<()> {
    if password == repeated {
        Ok(())
    } else {
        Err(WalletVaultError::PasswordMismatch)
    }
}
