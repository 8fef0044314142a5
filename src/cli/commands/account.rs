//! `walletvault account`: add, list and switch wallet accounts.

use crate::cli::{output, prompt_password, prompt_private_key, AccountAction, Cli, Context};
use crate::errors::Result;
use crate::vault::NewAccount;

/// Execute an `account` subcommand.
pub fn execute(cli: &Cli, action: &AccountAction) -> Result<()> {
    let ctx = Context::load(cli)?;

    match action {
        AccountAction::Add {
            name,
            network,
            public_key,
            activate,
        } => add(&ctx, name, network, public_key, *activate),
        AccountAction::List => list(&ctx),
        AccountAction::Use { name } => use_account(&ctx, name),
    }
}

fn add(ctx: &Context, name: &str, network: &str, public_key: &str, activate: bool) -> Result<()> {
    let vault = ctx.open_vault()?;

    let password = prompt_password("Vault password")?;
    let private_key = prompt_private_key()?;

    let record = vault.add_account(
        &password,
        NewAccount {
            name,
            network,
            public_key,
            private_key: private_key.trim().as_bytes(),
            activate,
        },
    )?;

    ctx.audit("account-add", Some(&record.name), Some(&record.network));
    output::success(&format!("Account '{}' added ({})", record.name, record.network));

    if let Some(active) = vault.store().active_account()? {
        if active.name() == record.name {
            output::info(&format!("'{}' is now the active account.", record.name));
        }
    }
    Ok(())
}

fn list(ctx: &Context) -> Result<()> {
    let vault = ctx.open_vault()?;
    let accounts = vault.store().accounts()?;
    let active = vault.store().active_account()?;
    output::print_accounts_table(&accounts, active.as_ref());
    Ok(())
}

fn use_account(ctx: &Context, name: &str) -> Result<()> {
    let vault = ctx.open_vault()?;
    let active = vault.use_account(name)?;

    ctx.audit("account-use", Some(active.name()), None);
    output::success(&format!("Active account is now '{}'", active.name()));
    Ok(())
}
