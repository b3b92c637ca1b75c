//! Install command: pre-populate the static partition

use colored::Colorize;
use serde::Serialize;

use crate::cli::args::GlobalOptions;
use crate::cli::{OutputFormat, ProxyContext};
use crate::error::Result;
use crate::output::{print_json, spinner};

#[derive(Debug, Serialize)]
struct InstallOutput<'a> {
    partition: &'a str,
    entries: usize,
    urls: Vec<String>,
}

/// Run the install command
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let ctx = ProxyContext::new(opts)?;
    let partition = &ctx.config().partitions.static_name;

    let progress = spinner(ctx.format, "Pre-populating static assets...");
    let result = ctx.proxy.handle_install().await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let entries = result?;

    match ctx.format {
        OutputFormat::Json => print_json(&InstallOutput {
            partition,
            entries,
            urls: ctx.config().precache_urls()?,
        })?,
        _ => println!(
            "{} Stored {} assets in {}",
            "✓".green(),
            entries,
            partition.bold()
        ),
    }

    Ok(())
}
