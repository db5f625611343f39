//! Command line definition.

use clap::{Args, Parser, Subcommand};

/// Provision tenant environments in Active Directory
#[derive(Parser, Debug)]
#[command(name = "tenant-provisioner")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Run against an in-memory directory instead of the configured server
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create OUs, security group and accounts for a new tenant
    CreateEnvironment(CreateEnvironmentArgs),

    /// Add accounts to an existing environment
    AddUsers(AddUsersArgs),

    /// Show what is provisioned for a host
    Describe(HostArgs),

    /// List provisioned environments
    ListEnvironments,

    /// List hosting servers and whether they answer
    ListHosts,

    /// Inspect or change a single account
    User(UserArgs),

    /// Check directory and inventory connectivity
    Health,
}

#[derive(Args, Debug)]
pub struct CreateEnvironmentArgs {
    /// Tenant display name
    #[arg(long)]
    pub tenant: String,

    /// Host (computer object) name
    #[arg(long)]
    pub host: String,

    /// Number of accounts to create
    #[arg(long, default_value = "1")]
    pub users: u32,

    /// Identity recorded on created objects
    #[arg(long)]
    pub requested_by: String,

    /// Override the job deadline in seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,
}

#[derive(Args, Debug)]
pub struct AddUsersArgs {
    /// Host (computer object) name
    #[arg(long)]
    pub host: String,

    /// Number of accounts to create
    #[arg(long, default_value = "1")]
    pub users: u32,

    /// Identity recorded on created objects
    #[arg(long)]
    pub requested_by: String,

    /// Override the job deadline in seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,
}

#[derive(Args, Debug)]
pub struct HostArgs {
    /// Host (computer object) name
    #[arg(long)]
    pub host: String,
}

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommands,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Show account details
    Info(UsernameArgs),
    /// Clear the disabled flag
    Enable(UsernameArgs),
    /// Set the disabled flag
    Disable(UsernameArgs),
    /// Clear an account lockout
    Unlock(UsernameArgs),
    /// Set a new password (generated when omitted)
    ResetPassword(ResetPasswordArgs),
}

#[derive(Args, Debug)]
pub struct UsernameArgs {
    /// Account name (sAMAccountName)
    pub username: String,
}

#[derive(Args, Debug)]
pub struct ResetPasswordArgs {
    /// Account name (sAMAccountName)
    pub username: String,

    /// New password; a passphrase is generated when omitted
    #[arg(long)]
    pub password: Option<String>,
}
