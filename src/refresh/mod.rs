//! Background feed refresh
//!
//! Triggered by a scheduling signal: fetch the feed manifest, fetch and parse
//! every listed feed through the aggregation proxy, wait for all of them to
//! settle, then tell connected clients the run finished.

pub mod manifest;
pub mod notice;
pub mod parallel;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::error::RefreshError;
use crate::http::{Fetcher, HttpResponse, ProxyRequest};
use crate::proxy::freshness::{format_stamp, stamp};
use crate::store::SharedStore;

pub use manifest::{FeedDescriptor, FeedDocument, parse_manifest};
pub use notice::{HostMessage, HostPort};
pub use parallel::settle_all;

/// Result of refreshing a single feed
#[derive(Debug)]
pub enum RefreshOutcome {
    Parsed(FeedDocument),
    Failed {
        feed: FeedDescriptor,
        error: RefreshError,
    },
}

impl RefreshOutcome {
    pub fn feed(&self) -> &FeedDescriptor {
        match self {
            RefreshOutcome::Parsed(doc) => &doc.feed,
            RefreshOutcome::Failed { feed, .. } => feed,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, RefreshOutcome::Parsed(_))
    }
}

/// Every outcome of one refresh run, in manifest order
#[derive(Debug)]
pub struct RefreshReport {
    pub outcomes: Vec<RefreshOutcome>,
    pub completed_at: DateTime<Utc>,
}

impl RefreshReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_parsed()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    pub fn summaries(&self) -> Vec<FeedSummary> {
        self.outcomes.iter().map(FeedSummary::from).collect()
    }
}

/// Flat, serializable view of one outcome for output
#[derive(Debug, Clone, Serialize)]
pub struct FeedSummary {
    pub url: String,
    pub name: String,
    pub ok: bool,
    /// Root element of the parsed document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&RefreshOutcome> for FeedSummary {
    fn from(outcome: &RefreshOutcome) -> Self {
        let feed = outcome.feed();
        let (format, title, items, error) = match outcome {
            RefreshOutcome::Parsed(doc) => (
                Some(doc.root.clone()),
                doc.title.clone(),
                doc.items,
                None,
            ),
            RefreshOutcome::Failed { error, .. } => (None, None, 0, Some(error.to_string())),
        };
        Self {
            url: feed.url.clone(),
            name: feed.label().to_string(),
            ok: outcome.is_parsed(),
            format,
            title,
            items,
            error,
        }
    }
}

/// One background refresh run
pub struct RefreshOrchestrator<'a, F: Fetcher + ?Sized> {
    pub config: &'a Config,
    pub fetcher: &'a F,
    pub host: &'a HostPort,
    pub store: Option<&'a SharedStore>,
}

impl<F: Fetcher + ?Sized> RefreshOrchestrator<'_, F> {
    /// Run to completion.
    ///
    /// A manifest failure aborts before any feed is fetched and before any
    /// notice is sent. Per-feed failures are collected, never propagated.
    pub async fn run(&self) -> Result<RefreshReport, RefreshError> {
        let feeds = self.fetch_manifest().await?;
        log::debug!("Refreshing {} feeds", feeds.len());

        let outcomes = settle_all(
            feeds,
            |feed| self.refresh_feed(feed),
            self.config.refresh.max_concurrent,
        )
        .await;

        let completed_at = Utc::now();
        let report = RefreshReport {
            outcomes,
            completed_at,
        };

        let delivered = self.host.broadcast(HostMessage::BackgroundUpdateComplete {
            timestamp: format_stamp(completed_at),
        });

        log::info!(
            "Refresh complete: {}/{} feeds parsed, notified {} clients",
            report.succeeded(),
            report.attempted(),
            delivered
        );

        Ok(report)
    }

    async fn fetch_manifest(&self) -> Result<Vec<FeedDescriptor>, RefreshError> {
        let url = &self.config.manifest_url;
        let response = self
            .fetcher
            .fetch(&ProxyRequest::get(url.as_str()))
            .await?
            .error_for_status(url)?;
        parse_manifest(&response.body)
    }

    async fn refresh_feed(&self, feed: FeedDescriptor) -> RefreshOutcome {
        let proxied = self.config.proxied_feed_url(&feed.url);
        let request = ProxyRequest::get(proxied.as_str());

        let response = match self.fetcher.fetch(&request).await {
            Ok(response) => response.error_for_status(&proxied),
            Err(e) => Err(e),
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Feed {} failed: {}", feed.url, e);
                return RefreshOutcome::Failed {
                    feed,
                    error: RefreshError::FeedFetch(e),
                };
            }
        };

        match FeedDocument::parse(feed.clone(), &response.text()) {
            Ok(doc) => {
                self.warm(&request, &response);
                RefreshOutcome::Parsed(doc)
            }
            Err(error) => {
                log::warn!("Feed {} failed: {}", feed.url, error);
                RefreshOutcome::Failed { feed, error }
            }
        }
    }

    /// Seed the API partition with a freshly fetched feed
    fn warm(&self, request: &ProxyRequest, response: &HttpResponse) {
        if !self.config.refresh.warm_api_partition {
            return;
        }
        let Some(store) = self.store else {
            return;
        };
        let stamped = stamp(response, Utc::now());
        if let Err(e) = store.put(
            &self.config.partitions.api_name,
            &request.cache_key(),
            &request.url,
            &stamped,
        ) {
            log::warn!("Failed to warm {}: {}", request.url, e);
        }
    }
}
