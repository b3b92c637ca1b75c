//! Classify command: show the strategy each URL is routed to

use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::cli::context::load_config;
use crate::error::Result;
use crate::output::print_json;
use crate::output::table::format_table;
use crate::proxy::{RequestClass, classify};

#[derive(Debug, Serialize, Tabled)]
struct ClassRow {
    #[tabled(rename = "CLASS")]
    class: &'static str,
    #[tabled(rename = "URL")]
    url: String,
}

/// Run the classify command
pub fn run(opts: &GlobalOptions, urls: &[String]) -> Result<()> {
    let config = load_config(opts)?;
    let rows: Vec<ClassRow> = urls
        .iter()
        .map(|url| ClassRow {
            class: classify(url, &config.api_hosts).as_str(),
            url: url.clone(),
        })
        .collect();

    match opts.format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table => println!("{}", format_table(&rows)),
        OutputFormat::Pretty => {
            for row in &rows {
                let class = if row.class == RequestClass::Api.as_str() {
                    format!("{:<6}", row.class).cyan()
                } else {
                    format!("{:<6}", row.class).normal()
                };
                println!("{} {}", class, row.url);
            }
        }
    }

    Ok(())
}
