//! Freshness-checked strategy for feed aggregation calls
//!
//! Serve a fresh cached copy when there is one; otherwise revalidate against
//! the network, store a stamped copy, and fall back to whatever is cached
//! (however old) when the network fails.

use chrono::Utc;
use std::time::Duration;

use super::freshness::{fetch_time, is_fresh, stamp};
use crate::http::{Fetcher, HttpResponse, ProxyRequest};
use crate::store::{CachedResource, SharedStore};

/// Body of the response served when the network fails and nothing is cached
pub const NETWORK_FAILED_BODY: &str = r#"{"error":"Network failed"}"#;

/// Synthetic 503 for a total failure
pub fn network_failed_response() -> HttpResponse {
    let mut response = HttpResponse::new(503, "Service Unavailable", NETWORK_FAILED_BODY);
    response.headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    response
}

pub struct ApiStrategy<'a, F: Fetcher + ?Sized> {
    pub store: Option<&'a SharedStore>,
    pub fetcher: &'a F,
    pub partition: &'a str,
    pub ttl: Duration,
}

impl<F: Fetcher + ?Sized> ApiStrategy<'_, F> {
    /// Never fails: the worst case is the synthetic 503.
    pub async fn serve(&self, request: &ProxyRequest) -> HttpResponse {
        let key = request.cache_key();
        let cached = self.lookup(&key, &request.url);

        if let Some(ref entry) = cached
            && is_fresh(fetch_time(&entry.response), Utc::now(), self.ttl)
        {
            log::debug!("API hit (fresh): {}", request.url);
            return entry.response.clone();
        }

        let fetched = match self.fetcher.fetch(request).await {
            Ok(response) => response.error_for_status(&request.url),
            Err(e) => Err(e),
        };

        match fetched {
            Ok(response) => {
                self.remember(&key, &request.url, &response);
                response
            }
            Err(e) => match cached {
                Some(entry) => {
                    log::warn!("Serving stale {} after fetch failure: {}", request.url, e);
                    entry.response
                }
                None => {
                    log::warn!("No cached copy of {} after fetch failure: {}", request.url, e);
                    network_failed_response()
                }
            },
        }
    }

    fn lookup(&self, key: &str, url: &str) -> Option<CachedResource> {
        let store = self.store?;
        match store.get(self.partition, key) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("API lookup failed for {}: {}", url, e);
                None
            }
        }
    }

    /// Store a stamped copy; the caller keeps the unstamped original.
    fn remember(&self, key: &str, url: &str, response: &HttpResponse) {
        let Some(store) = self.store else {
            return;
        };
        let stamped = stamp(response, Utc::now());
        match store.put(self.partition, key, url, &stamped) {
            Ok(()) => log::debug!("API revalidated: {}", url),
            Err(e) => log::warn!("Failed to store {}: {}", url, e),
        }
    }
}
