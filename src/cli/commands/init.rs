//! `walletvault init`: set the master password of a new vault.

use crate::cli::{output, prompt_new_password, Cli, Context, NEW_PASSWORD_ENV};
use crate::errors::{Result, WalletVaultError};

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;
    let vault = ctx.open_vault()?;

    // Fail before prompting if the vault is already initialized.
    if vault.store().credential()?.is_some() {
        output::tip("Use `walletvault change-password` to pick a new password.");
        return Err(WalletVaultError::CredentialAlreadySet);
    }

    let password = prompt_new_password(NEW_PASSWORD_ENV)?;
    vault.initialize(&password)?;

    ctx.audit("init", None, Some("master password set"));

    output::success(&format!("Vault initialized at {}", ctx.store_dir.display()));
    output::tip("Run `walletvault account add <NAME> --network <NET> --public-key <KEY>`.");

    Ok(())
}
