//! Sync command: deliver a scheduling signal to the proxy
//!
//! The command registers itself as a host client before signalling, so any
//! completion notice the refresh posts is drained and printed afterwards.

use chrono::Local;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::args::GlobalOptions;
use crate::cli::{OutputFormat, ProxyContext};
use crate::error::Result;
use crate::output::formatters::truncate;
use crate::output::table::format_table;
use crate::output::{print_json, spinner};
use crate::proxy::freshness::format_stamp;
use crate::refresh::{FeedSummary, HostMessage};

#[derive(Debug, Serialize)]
struct SyncOutput<'a> {
    tag: &'a str,
    ran: bool,
    completed_at: Option<String>,
    attempted: usize,
    succeeded: usize,
    failed: usize,
    feeds: Vec<FeedSummary>,
    notices: Vec<HostMessage>,
}

#[derive(Debug, Tabled)]
struct FeedRow {
    #[tabled(rename = "FEED")]
    name: String,
    #[tabled(rename = "STATUS")]
    status: &'static str,
    #[tabled(rename = "ITEMS")]
    items: usize,
    #[tabled(rename = "DETAIL")]
    detail: String,
}

impl From<&FeedSummary> for FeedRow {
    fn from(summary: &FeedSummary) -> Self {
        let detail = match (&summary.error, &summary.title) {
            (Some(error), _) => error.clone(),
            (None, Some(title)) => title.clone(),
            (None, None) => String::new(),
        };
        Self {
            name: truncate(&summary.name, 40),
            status: if summary.ok { "ok" } else { "failed" },
            items: summary.items,
            detail: truncate(&detail, 60),
        }
    }
}

/// Run the sync command
pub async fn run(opts: &GlobalOptions, tag: Option<&str>) -> Result<()> {
    let ctx = ProxyContext::new(opts)?;
    let tag = tag.unwrap_or(&ctx.config().sync_tag).to_string();

    let host = ctx.proxy.host();
    let client = host.connect();
    log::debug!("{} host clients connected", host.connected());

    let progress = spinner(ctx.format, "Refreshing feeds...");
    let report = ctx.proxy.handle_sync(&tag).await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let notices = host.drain(client);
    host.disconnect(client);

    let feeds = report.as_ref().map(|r| r.summaries()).unwrap_or_default();

    match ctx.format {
        OutputFormat::Json => print_json(&SyncOutput {
            tag: &tag,
            ran: report.is_some(),
            completed_at: report.as_ref().map(|r| format_stamp(r.completed_at)),
            attempted: report.as_ref().map_or(0, |r| r.attempted()),
            succeeded: report.as_ref().map_or(0, |r| r.succeeded()),
            failed: report.as_ref().map_or(0, |r| r.failed()),
            feeds,
            notices,
        })?,
        OutputFormat::Table => {
            let rows: Vec<FeedRow> = feeds.iter().map(FeedRow::from).collect();
            println!("{}", format_table(&rows));
            print_notices(&notices)?;
        }
        OutputFormat::Pretty => {
            match &report {
                Some(report) => {
                    for feed in &feeds {
                        if feed.ok {
                            println!("{} {} ({} items)", "✓".green(), feed.name, feed.items);
                        } else {
                            println!(
                                "{} {} {}",
                                "✗".red(),
                                feed.name,
                                feed.error.as_deref().unwrap_or_default().dimmed()
                            );
                        }
                    }
                    println!(
                        "\n{} of {} feeds refreshed at {}",
                        report.succeeded().to_string().bold(),
                        report.attempted(),
                        report.completed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
                    );
                }
                None => println!("{} No refresh ran for tag '{}'", "⚠".yellow(), tag),
            }
            print_notices(&notices)?;
        }
    }

    Ok(())
}

/// One JSON line per notice, as a client would receive it
fn print_notices(notices: &[HostMessage]) -> Result<()> {
    for notice in notices {
        println!("{}", serde_json::to_string(notice)?);
    }
    Ok(())
}
