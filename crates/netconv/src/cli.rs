//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Reconcile a network controller against a declarative input document.
#[derive(Debug, Parser)]
#[command(name = "netconv", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection options shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// TOML configuration file
    #[arg(long, short = 'c', env = "NETCONV_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Controller base URL
    #[arg(long, env = "NETCONV_CONTROLLER_URL", global = true)]
    pub controller: Option<String>,

    /// Login for the token exchange
    #[arg(long, short = 'u', env = "NETCONV_USERNAME", global = true)]
    pub username: Option<String>,

    /// Password for the token exchange
    #[arg(long, env = "NETCONV_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Pre-issued session token
    #[arg(long, env = "NETCONV_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "NETCONV_INSECURE", global = true)]
    pub insecure: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Converge the controller towards an input document
    Apply(ApplyArgs),

    /// List the devices assigned to a site and its descendants
    Devices(DevicesArgs),
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Input document (YAML, or JSON when the extension is `.json`)
    pub input: PathBuf,

    /// Print the planned actions without changing anything
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Site path, e.g. `Global/HQ/B1`
    #[arg(long, short = 's')]
    pub site: String,
}
