//! Freshness policy for cached API responses

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Duration;

use crate::http::HttpResponse;

/// Header carrying the fetch time on stored API responses
pub const CACHE_TIME_HEADER: &str = "x-cache-time";

/// Whether an entry fetched at `fetched_at` may be served at `now`.
///
/// Fresh iff `now - fetched_at < ttl`. An unknown fetch time is never fresh.
pub fn is_fresh(fetched_at: Option<DateTime<Utc>>, now: DateTime<Utc>, ttl: Duration) -> bool {
    let Some(fetched_at) = fetched_at else {
        return false;
    };
    let Ok(ttl) = chrono::Duration::from_std(ttl) else {
        // Larger than chrono can represent
        return true;
    };
    now.signed_duration_since(fetched_at) < ttl
}

/// Fetch time recorded on a stored response; `None` when missing or malformed
pub fn fetch_time(response: &HttpResponse) -> Option<DateTime<Utc>> {
    parse_stamp(response.header(CACHE_TIME_HEADER)?)
}

/// Parse an RFC 3339 stamp
pub fn parse_stamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Format a time the way stamps and notices carry it
pub fn format_stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Copy of `response` stamped with `fetched_at`
pub fn stamp(response: &HttpResponse, fetched_at: DateTime<Utc>) -> HttpResponse {
    response.with_header(CACHE_TIME_HEADER, &format_stamp(fetched_at))
}
