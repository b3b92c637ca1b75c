//! Reusable formatting utilities for CLI output

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{TimeZone, Utc};
use serde::Serialize;

/// Format a Unix timestamp (seconds) as local date/time.
///
/// Returns "N/A" for invalid timestamps.
///
/// # Example output
/// `2025-01-15 14:30`
pub fn format_timestamp_local(secs: i64) -> String {
    match Utc.timestamp_opt(secs, 0) {
        chrono::LocalResult::Single(dt) => dt
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        _ => "N/A".to_string(),
    }
}

/// Format bytes as human-readable size
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    const GB: usize = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// A response body ready for JSON output
#[derive(Debug, Serialize)]
pub struct EncodedBody {
    /// `utf8` or `base64`
    pub encoding: &'static str,
    pub content: String,
}

/// Keep UTF-8 bodies readable, base64 anything else
pub fn encode_body(body: &[u8]) -> EncodedBody {
    match std::str::from_utf8(body) {
        Ok(text) => EncodedBody {
            encoding: "utf8",
            content: text.to_string(),
        },
        Err(_) => EncodedBody {
            encoding: "base64",
            content: STANDARD.encode(body),
        },
    }
}

/// Shorten long values for table cells
pub fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let kept: String = value.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}
