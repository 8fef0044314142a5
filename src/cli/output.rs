//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::{AccountRecord, ActiveAccountRecord};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of accounts (Name, Network, Public key, Created),
/// marking the active one.
pub fn print_accounts_table(accounts: &[AccountRecord], active: Option<&ActiveAccountRecord>) {
    if accounts.is_empty() {
        info("No accounts in this vault yet.");
        tip("Run `walletvault account add <NAME> --network <NET> --public-key <KEY>`.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["", "Name", "Network", "Public key", "Created"]);

    for account in accounts {
        let marker = if active.is_some_and(|a| a.name() == account.name) {
            "*"
        } else {
            ""
        };
        table.add_row(vec![
            marker.to_string(),
            account.name.clone(),
            account.network.clone(),
            account.public_key.clone(),
            account.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{table}");
}
