//! newscache - offline-first caching proxy for a news reader

use clap::Parser;
use colored::Colorize;

mod cli;
mod config;
mod error;
mod http;
mod output;
mod proxy;
mod refresh;
mod store;

use cli::args::GlobalOptions;
use cli::{CacheCommands, Cli, Commands, ConfigCommands};
use error::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{} {}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Fetch {
            url,
            method,
            headers,
        } => cli::fetch::run(&opts, &url, &method, &headers).await,
        Commands::Install => cli::install::run(&opts).await,
        Commands::Sync { tag } => cli::sync::run(&opts, tag.as_deref()).await,
        Commands::Classify { urls } => cli::classify::run(&opts, &urls),
        Commands::Cache(cache_cmd) => match cache_cmd {
            CacheCommands::Status => cli::cache::status(&opts),
            CacheCommands::List { partition } => cli::cache::list(&opts, partition.as_deref()),
            CacheCommands::Clear { partition, yes } => {
                cli::cache::clear(&opts, partition.as_deref(), yes)
            }
            CacheCommands::Path => cli::cache::path(&opts),
        },
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Show => cli::config::show(&opts),
            ConfigCommands::Path => cli::config::path(&opts),
            ConfigCommands::Init { force } => cli::config::init(&opts, force),
        },
        Commands::Completions { shell } => {
            cli::completions::run(shell);
            Ok(())
        }
    }
}

/// `--debug` lowers the default filter to debug; `RUST_LOG` still wins.
fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}
