//! CLI command definitions and handlers

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;

pub mod args;
pub mod cache;
pub mod classify;
pub mod completions;
pub mod config;
pub mod context;
pub mod fetch;
pub mod install;
pub mod sync;

pub use args::OutputFormat;
pub use context::ProxyContext;

/// newscache - offline-first caching proxy for a news reader
#[derive(Parser, Debug)]
#[command(name = "newscache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "NEWSCACHE_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "NEWSCACHE_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "NEWSCACHE_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Run without the resource store (every request goes to the network)
    #[arg(long, global = true, env = "NEWSCACHE_NO_STORE", hide_env = true)]
    pub no_store: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer one request through the proxy
    #[command(after_help = "\
Examples:
  newscache fetch http://localhost:8080/styles.css
  newscache fetch 'https://api.allorigins.win/raw?url=https%3A%2F%2Fexample.com%2Frss'
  newscache fetch https://example.com/form -X POST -H 'Accept: text/html'")]
    Fetch {
        /// Absolute request URL
        url: String,

        /// HTTP method
        #[arg(long, short = 'X', default_value = "GET")]
        method: String,

        /// Request header as 'Name: value' (repeatable)
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,
    },

    /// Pre-populate the static partition with the asset list
    Install,

    /// Deliver a scheduling signal (runs the background refresh)
    Sync {
        /// Signal tag (defaults to the configured sync tag)
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show which strategy each URL is routed to
    Classify {
        /// URLs to classify
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Inspect and manage the resource store
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Show or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Store management subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show per-partition statistics
    Status,
    /// List entries in a partition
    List {
        /// Partition name (defaults to the API partition)
        #[arg(long, short = 'p')]
        partition: Option<String>,
    },
    /// Remove stored entries
    Clear {
        /// Only clear this partition
        #[arg(long, short = 'p')]
        partition: Option<String>,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Print store directory path
    Path,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
