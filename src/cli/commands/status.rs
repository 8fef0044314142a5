//! `walletvault status`: vault initialization and active-account state.

use console::style;

use crate::cli::{output, prompt_password, Cli, Context};
use crate::errors::Result;

/// Execute the `status` command.
pub fn execute(cli: &Cli, unlock: bool) -> Result<()> {
    let ctx = Context::load(cli)?;
    let vault = ctx.open_vault()?;
    let store = vault.store();

    if store.credential()?.is_none() {
        output::info("Vault is not initialized.");
        output::tip("Run `walletvault init` to set a master password.");
        return Ok(());
    }

    let accounts = store.accounts()?;
    println!("{} {}", style("Store:").bold(), ctx.store_dir.display());
    println!("{} {}", style("Accounts:").bold(), accounts.len());

    let Some(active) = store.active_account()? else {
        output::info("No active account.");
        return Ok(());
    };
    println!(
        "{} {} ({}, {})",
        style("Active:").bold(),
        active.name(),
        active.account.network,
        active.account.public_key
    );

    if unlock {
        let password = prompt_password("Vault password")?;
        if vault.is_active_authenticated(&password)? {
            output::success("Active account unlocked");
        } else {
            output::warning("Password does not unlock the active account");
        }
    }

    Ok(())
}
