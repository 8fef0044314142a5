//! One module per subcommand.

pub mod account;
#[cfg(feature = "audit-log")]
pub mod audit_cmd;
pub mod change_password;
pub mod check;
pub mod completions;
pub mod init;
pub mod status;
