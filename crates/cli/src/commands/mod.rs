//! CLI command definitions and execution
//!
//! Each command parses its remote path, loads the named profile, builds a
//! storage client and reports failures through the shared formatter.

use clap::{Parser, Subcommand};

use cf_core::{ProfileManager, RemotePath, parse_remote_path};
use cf_swift::StorageClient;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod cat;
mod completions;
mod ls;
mod profile;
mod put;
mod rm;
mod stat;

/// cf - Rackspace Cloud Files CLI
///
/// List, inspect, upload and delete containers and objects in Cloud Files.
#[derive(Parser, Debug)]
#[command(name = "cf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage Cloud Files account profiles
    #[command(subcommand)]
    Profile(profile::ProfileCommands),

    /// List containers or objects
    Ls(ls::LsArgs),

    /// Show container or object attributes
    Stat(stat::StatArgs),

    /// Write object contents to stdout
    Cat(cat::CatArgs),

    /// Upload a local file as an object
    Put(put::PutArgs),

    /// Remove an object
    Rm(rm::RmArgs),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Profile(cmd) => profile::execute(cmd, output_config).await,
        Commands::Ls(args) => ls::execute(args, output_config).await,
        Commands::Stat(args) => stat::execute(args, output_config).await,
        Commands::Cat(args) => cat::execute(args, output_config).await,
        Commands::Put(args) => put::execute(args, output_config).await,
        Commands::Rm(args) => rm::execute(args, output_config).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Parse a remote path argument, reporting a usage error on failure
fn parse_path(path: &str, formatter: &Formatter) -> Result<RemotePath, ExitCode> {
    parse_remote_path(path).map_err(|e| {
        formatter.error(&e.to_string());
        ExitCode::UsageError
    })
}

/// Build a storage client for the named profile
///
/// Nothing is sent until the first request; authentication failures surface
/// from the command's first call.
fn client_for(profile_name: &str, formatter: &Formatter) -> Result<StorageClient, ExitCode> {
    let manager = ProfileManager::new().map_err(|e| formatter.fail("Failed to load profiles", &e))?;
    let profile = manager
        .get(profile_name)
        .map_err(|e| formatter.fail("Cannot use profile", &e))?;

    tracing::debug!(profile = %profile.name, region = ?profile.region, "creating storage client");
    StorageClient::from_profile(&profile).map_err(|e| formatter.fail("Failed to create client", &e))
}
