//! Command-line tooling for Warden
//!
//! Inspects right catalogs, decodes ACE lines, and replays right checks
//! against fixture worlds described in TOML.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod world;

use commands::{ace, check, rights};

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Warden - directory ACL inspection and right checking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, default_value = "warden.toml")]
    config: PathBuf,

    /// Right definitions; overrides `rights_file` from the config
    #[arg(short, long, global = true)]
    rights: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the rights of the catalog
    Rights {
        /// Only show user rights
        #[arg(long)]
        user: bool,
    },

    /// Decode and validate one ACE line
    ParseAce {
        /// ACE in wire form, e.g. `<id> usr -sendAs`
        ace: String,
    },

    /// Show the grants stored on an entry of a world
    Acl {
        /// World fixture
        #[arg(short, long)]
        world: PathBuf,

        /// Entry name, id or `globalgrant`
        #[arg(short, long)]
        target: String,
    },

    /// Check whether a grantee holds a right on a target
    Check(check::CheckArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let config = config::load(&cli.config)?;
    let catalog = || config::catalog(&config, cli.rights.as_deref());

    match cli.command {
        Commands::Rights { user } => rights::list(&*catalog()?, user),
        Commands::ParseAce { ace } => ace::parse(&*catalog()?, &ace),
        Commands::Acl { world, target } => ace::show_acl(&*catalog()?, &config.grants, &world, &target),
        Commands::Check(args) => check::run(&config, catalog()?, &args),
    }
}
