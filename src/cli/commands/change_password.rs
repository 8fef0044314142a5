//! `walletvault change-password`: change the master password.
//!
//! Checks the current password first (so a typo is reported before the
//! new password is asked for), then reads the new password twice and
//! hands both to the rekey coordinator, which re-encrypts every account
//! key and the active account before replacing the credential.

use crate::cli::{output, prompt_new_password, prompt_password, Cli, Context, NEW_PASSWORD_ENV};
use crate::errors::{Result, WalletVaultError};
use crate::vault::{AbortReason, RekeyOutcome, Verification};

/// Execute the `change-password` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;
    let mut vault = ctx.open_vault()?;

    // 1. Current password.
    let current = prompt_password("Current password")?;
    match vault.check_current_password(&current)? {
        Verification::Matched => output::info(Verification::Matched.user_message()),
        Verification::Mismatched => return Err(WalletVaultError::WrongPassword),
        Verification::NoCredentialSet => return Err(WalletVaultError::NoCredentialSet),
    }

    // 2. New password, typed twice.
    let new = prompt_new_password(NEW_PASSWORD_ENV)?;

    // 3. Rekey.  The audit entry for success is written by the hook so
    //    it only ever appears once per completed change.
    let hook_ctx = ctx.clone();
    vault.on_password_changed(move |report| {
        let details = format!(
            "{} accounts rekeyed, active account {}",
            report.accounts_rekeyed,
            if report.active_rekeyed { "rekeyed" } else { "absent" }
        );
        hook_ctx.audit("change-password", None, Some(&details));
    });

    match vault.change_password(&current, &new) {
        RekeyOutcome::Done(report) => {
            output::success(&format!(
                "Master password changed ({} accounts re-encrypted)",
                report.accounts_rekeyed
            ));
            Ok(())
        }
        RekeyOutcome::Aborted(reason) => {
            ctx.audit("change-password-aborted", None, Some(&reason.to_string()));
            output::warning(reason.user_message());
            if let AbortReason::PersistFailed { .. } = reason {
                output::tip("Run `walletvault check` with each password to see which one unlocks the vault, then retry.");
            }
            Err(WalletVaultError::RekeyAborted(reason.to_string()))
        }
    }
}
