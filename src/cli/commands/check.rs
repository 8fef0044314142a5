//! `walletvault check`: verify a password against the stored credential.

use crate::cli::{output, prompt_password, Cli, Context};
use crate::errors::{Result, WalletVaultError};
use crate::vault::Verification;

/// Execute the `check` command.  Exits non-zero unless the password matches.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;
    let vault = ctx.open_vault()?;

    let candidate = prompt_password("Current password")?;
    match vault.check_current_password(&candidate)? {
        Verification::Matched => {
            output::success(Verification::Matched.user_message());
            Ok(())
        }
        Verification::Mismatched => Err(WalletVaultError::WrongPassword),
        Verification::NoCredentialSet => Err(WalletVaultError::NoCredentialSet),
    }
}
