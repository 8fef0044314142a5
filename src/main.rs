use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use walletvault::cli::{Cli, Commands};

fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => walletvault::cli::commands::init::execute(&cli),
        Commands::Check => walletvault::cli::commands::check::execute(&cli),
        Commands::ChangePassword => walletvault::cli::commands::change_password::execute(&cli),
        Commands::Account { ref action } => {
            walletvault::cli::commands::account::execute(&cli, action)
        }
        Commands::Status { unlock } => walletvault::cli::commands::status::execute(&cli, unlock),
        Commands::Audit { last, ref since } => run_audit(&cli, last, since.as_deref()),
        Commands::Completions { shell } => walletvault::cli::commands::completions::execute(shell),
    };

    if let Err(e) = result {
        walletvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(feature = "audit-log")]
fn run_audit(cli: &Cli, last: usize, since: Option<&str>) -> walletvault::errors::Result<()> {
    walletvault::cli::commands::audit_cmd::execute(cli, last, since)
}

#[cfg(not(feature = "audit-log"))]
fn run_audit(_cli: &Cli, _last: usize, _since: Option<&str>) -> walletvault::errors::Result<()> {
    Err(walletvault::errors::WalletVaultError::AuditError(
        "audit log support was not compiled in (enable the `audit-log` feature)".into(),
    ))
}
