//! Netlistore CLI - Drive the storefront offline layer from a terminal.
//!
//! Commands:
//! - `netlistore fetch` - Send one request through the cache manager
//! - `netlistore caches` - Inspect or purge the named caches
//! - `netlistore queue` - Record, list and drain offline actions
//! - `netlistore data` - Read and write the time-bounded data cache
//! - `netlistore config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CachesArgs, ConfigArgs, DataArgs, FetchArgs, QueueArgs};

/// Netlistore - Offline cache and action queue for the storefront
#[derive(Parser)]
#[command(name = "netlistore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Fail every network fetch, to exercise offline fallbacks
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a request through the cache manager
    Fetch(FetchArgs),

    /// Inspect or purge the request caches
    Caches(CachesArgs),

    /// Manage the offline action queue
    Queue(QueueArgs),

    /// Read and write cached data
    Data(DataArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Setup output formatting
    let output = output::Output::new(cli.verbose, cli.json);

    // Load config
    let config_path = cli.config.as_deref();
    let ctx = context::Context::load(config_path, cli.offline, output)?;

    // Execute command
    let result = match cli.command {
        Commands::Fetch(args) => commands::fetch::run(args, &ctx).await,
        Commands::Caches(args) => commands::caches::run(args, &ctx).await,
        Commands::Queue(args) => commands::queue::run(args, &ctx).await,
        Commands::Data(args) => commands::data::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
