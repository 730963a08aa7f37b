//! CLI command implementations.

pub mod caches;
pub mod config;
pub mod data;
pub mod fetch;
pub mod queue;

use clap::{Args, Subcommand};

/// Arguments for the fetch command.
#[derive(Args)]
pub struct FetchArgs {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// Request the URL as an image.
    #[arg(long, conflicts_with_all = ["navigate", "destination"])]
    pub image: bool,

    /// Request the URL as a top-level navigation.
    #[arg(long, conflicts_with = "destination")]
    pub navigate: bool,

    /// Declared destination (document, image, script, style, font, manifest).
    #[arg(short, long)]
    pub destination: Option<String>,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Re-provision the static cache even if it already exists.
    #[arg(long)]
    pub reinstall: bool,

    /// Maximum body characters to print.
    #[arg(long, default_value = "400")]
    pub preview: usize,
}

/// Arguments for the caches command.
#[derive(Args)]
pub struct CachesArgs {
    #[command(subcommand)]
    pub command: CachesCommand,
}

#[derive(Subcommand)]
pub enum CachesCommand {
    /// List caches and their entries.
    List {
        /// Show every entry, not just counts.
        #[arg(short, long)]
        entries: bool,
    },
    /// Delete caches.
    Purge {
        /// Only delete caches outside the current version.
        #[arg(long)]
        stale: bool,
        /// Skip confirmation.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the queue command.
#[derive(Args)]
pub struct QueueArgs {
    #[command(subcommand)]
    pub command: QueueCommand,
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// Record an action for later replay.
    Record {
        /// Action type (add-to-cart, add-to-wishlist, remove-from-wishlist, order-checkout).
        kind: String,
        /// Action payload as JSON.
        #[arg(short, long, default_value = "{}")]
        data: String,
    },
    /// List pending actions.
    List,
    /// Replay pending actions now.
    Drain,
    /// Show the offline indicator state.
    Status,
}

/// Arguments for the data command.
#[derive(Args)]
pub struct DataArgs {
    #[command(subcommand)]
    pub command: DataCommand,
}

#[derive(Subcommand)]
pub enum DataCommand {
    /// Cache a JSON value under a key.
    Set {
        /// Cache key.
        key: String,
        /// JSON value.
        value: String,
    },
    /// Read a cached value if still fresh.
    Get {
        /// Cache key.
        key: String,
        /// Maximum age in milliseconds (default from config).
        #[arg(long)]
        max_age_ms: Option<u64>,
    },
    /// Remove every cached value.
    Clear,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Where to write the file (default: ./netlistore.toml).
        #[arg(short, long)]
        path: Option<String>,
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}
