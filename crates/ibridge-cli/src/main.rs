//! island-bridge CLI - Keep a local directory and a remote SSH directory in sync
//!
//! Provides commands for:
//! - One-off upload, download or bidirectional passes
//! - Watching the local tree and pushing changes as they settle
//! - Checking configuration and connectivity
//! - Creating and inspecting configuration files

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;
mod progress;

use commands::{
    completions::CompletionsCommand, config::ConfigCommand, git::GitCommand, init::InitCommand,
    status::StatusCommand, sync::SyncCommand, watch::WatchCommand,
};
use context::CliContext;
use ibridge_core::config::LoggingConfig;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "ibridge",
    version,
    about = "Sync a local directory with a remote host over SSH"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate global config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project to operate on (defaults to the first configured one)
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Skip SSH host key verification
    #[arg(long, global = true)]
    insecure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one sync pass
    Sync(SyncCommand),
    /// Watch the local directory and upload changes
    Watch(WatchCommand),
    /// Show configuration and connection status
    Status(StatusCommand),
    /// View and check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Create a project configuration file in the current directory
    Init(InitCommand),
    /// Run git in the project's remote directory
    #[command(subcommand)]
    Git(GitCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

fn init_tracing(verbose: u8, quiet: bool, logging: &LoggingConfig) {
    let level = match (verbose, quiet) {
        (0, true) => "warn",
        (0, false) => logging.level.as_str(),
        (1, _) => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = CliContext::from_cli(&cli)?;

    // a broken config is reported by the command itself
    let logging = ctx
        .load_config()
        .map(|config| config.logging)
        .unwrap_or_default();
    init_tracing(cli.verbose, cli.quiet, &logging);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx, format).await,
        Commands::Watch(cmd) => cmd.execute(&ctx, format).await,
        Commands::Status(cmd) => cmd.execute(&ctx, format).await,
        Commands::Config(cmd) => cmd.execute(&ctx, format).await,
        Commands::Init(cmd) => cmd.execute(&ctx, format).await,
        Commands::Git(cmd) => cmd.execute(&ctx, format).await,
        Commands::Completions(cmd) => cmd.execute(format).await,
    }
}
