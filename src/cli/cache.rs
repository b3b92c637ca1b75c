//! Resource store management commands

use colored::Colorize;
use dialoguer::{Confirm, theme::ColorfulTheme};
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::cli::context::load_config;
use crate::error::Result;
use crate::output::formatters::{format_size, format_timestamp_local, truncate};
use crate::output::print_json;
use crate::output::table::format_table;
use crate::store::ResourceStore;
use crate::store::storage::EntrySummary;

#[derive(Debug, Tabled)]
struct PartitionRow {
    #[tabled(rename = "PARTITION")]
    name: String,
    #[tabled(rename = "ENTRIES")]
    entries: usize,
    #[tabled(rename = "SIZE")]
    size: String,
    #[tabled(rename = "OLDEST")]
    oldest: String,
    #[tabled(rename = "NEWEST")]
    newest: String,
}

#[derive(Debug, Tabled)]
struct EntryRow {
    #[tabled(rename = "STATUS")]
    status: u16,
    #[tabled(rename = "SIZE")]
    size: String,
    #[tabled(rename = "STORED")]
    stored: String,
    #[tabled(rename = "URL")]
    url: String,
}

impl From<&EntrySummary> for EntryRow {
    fn from(entry: &EntrySummary) -> Self {
        Self {
            status: entry.status,
            size: format_size(entry.size_bytes),
            stored: format_timestamp_local(entry.stored_at),
            url: truncate(&entry.url, 80),
        }
    }
}

fn optional_time(secs: Option<i64>) -> String {
    secs.map(format_timestamp_local)
        .unwrap_or_else(|| "-".to_string())
}

/// Show per-partition store statistics
pub fn status(opts: &GlobalOptions) -> Result<()> {
    let config = load_config(opts)?;
    let store = ResourceStore::open(&config)?;
    let stats = store.stats()?;

    match opts.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "path": store.path().display().to_string(),
                "total_entries": stats.total_entries(),
                "total_size_bytes": stats.total_size_bytes(),
                "total_size_human": format_size(stats.total_size_bytes()),
                "partitions": stats.partitions,
            });
            print_json(&json)?;
        }
        OutputFormat::Table => {
            let rows: Vec<PartitionRow> = stats
                .partitions
                .iter()
                .map(|p| PartitionRow {
                    name: p.name.clone(),
                    entries: p.entries,
                    size: format_size(p.size_bytes),
                    oldest: optional_time(p.oldest_entry),
                    newest: optional_time(p.newest_entry),
                })
                .collect();
            println!("{}", format_table(&rows));
        }
        OutputFormat::Pretty => {
            println!("{}", "Resource Store".bold());
            println!("────────────────────────────────────────");
            println!("Location:       {}", store.path().display().to_string().cyan());
            println!("Total entries:  {}", stats.total_entries());
            println!("Total size:     {}", format_size(stats.total_size_bytes()));

            for name in [&config.partitions.static_name, &config.partitions.api_name] {
                println!();
                println!("{}", name.bold());
                match stats.partition(name) {
                    Some(p) => {
                        println!("  Entries:      {}", p.entries);
                        println!("  Size:         {}", format_size(p.size_bytes));
                        println!("  Oldest entry: {}", optional_time(p.oldest_entry));
                        println!("  Newest entry: {}", optional_time(p.newest_entry));
                    }
                    None => println!("  {}", "empty".dimmed()),
                }
            }

            // Partitions left behind by an earlier configuration
            for p in &stats.partitions {
                if p.name != config.partitions.static_name && p.name != config.partitions.api_name {
                    println!();
                    println!("{} {}", p.name.bold(), "(not in config)".yellow());
                    println!("  Entries:      {}", p.entries);
                }
            }
        }
    }

    Ok(())
}

/// List entries of one partition
pub fn list(opts: &GlobalOptions, partition: Option<&str>) -> Result<()> {
    let config = load_config(opts)?;
    let partition = partition.unwrap_or(&config.partitions.api_name);
    let store = ResourceStore::open(&config)?;
    let entries = store.list(partition)?;

    match opts.format {
        OutputFormat::Json => print_json(&entries)?,
        _ => {
            let rows: Vec<EntryRow> = entries.iter().map(EntryRow::from).collect();
            println!("{}", format_table(&rows));
        }
    }

    Ok(())
}

/// Clear one partition, or everything
pub fn clear(opts: &GlobalOptions, partition: Option<&str>, yes: bool) -> Result<()> {
    let config = load_config(opts)?;
    let store = ResourceStore::open(&config)?;

    if !yes {
        let target = match partition {
            Some(name) => format!("partition '{}'", name),
            None => "all stored responses".to_string(),
        };
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Clear {}?", target))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let stats = match partition {
        Some(name) => store.clear_partition(name)?,
        None => store.clear_all()?,
    };

    match opts.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "partition": partition,
                "entries_removed": stats.entries_removed,
                "success": true,
            });
            print_json(&json)?;
        }
        _ => {
            if stats.entries_removed > 0 {
                println!("{} Cleared {} entries", "✓".green(), stats.entries_removed);
            } else {
                println!("Store was already empty");
            }
        }
    }

    Ok(())
}

/// Print the store directory
pub fn path(opts: &GlobalOptions) -> Result<()> {
    let config = load_config(opts)?;
    let dir = ResourceStore::dir_for(&config)?;
    println!("{}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_row_formats_fields() {
        let entry = EntrySummary {
            url: "https://api.allorigins.win/raw?url=x".to_string(),
            status: 200,
            size_bytes: 2048,
            stored_at: 1736942400,
            cache_time: Some("2025-01-15T12:00:00.000Z".to_string()),
        };

        let row = EntryRow::from(&entry);

        assert_eq!(row.status, 200);
        assert_eq!(row.size, "2.00 KB");
        assert!(row.stored.starts_with("2025-01-1"));
    }

    #[test]
    fn test_optional_time_missing() {
        assert_eq!(optional_time(None), "-");
    }
}
