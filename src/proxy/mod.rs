//! The caching proxy and its event handlers
//!
//! A host dispatcher calls one handler per event:
//!
//! - [`Proxy::handle_install`] once, to pre-populate the static partition
//! - [`Proxy::handle_fetch`] for every intercepted request
//! - [`Proxy::handle_sync`] when a scheduling signal arrives
//!
//! Completion notices from background refreshes are left on [`Proxy::host`]
//! for the host to drain.

pub mod api;
pub mod freshness;
pub mod router;
pub mod static_assets;

use reqwest::Method;

use crate::config::Config;
use crate::error::{FetchError, Result, StoreError};
use crate::http::{Fetcher, HttpResponse, ProxyRequest};
use crate::refresh::{HostPort, RefreshOrchestrator, RefreshReport};
use crate::store::{ResourceStore, SharedStore, ensure_populated};

pub use api::ApiStrategy;
pub use router::{RequestClass, classify};
pub use static_assets::StaticStrategy;

/// Caching proxy over a [`Fetcher`]
pub struct Proxy<F: Fetcher> {
    config: Config,
    fetcher: F,
    store: Option<SharedStore>,
    host: HostPort,
}

impl<F: Fetcher> Proxy<F> {
    /// Create a proxy.
    ///
    /// `store` is `None` when the store could not be opened; every strategy
    /// then degrades to a direct network fetch without caching.
    pub fn new(config: Config, fetcher: F, store: Option<ResourceStore>) -> Self {
        Self {
            config,
            fetcher,
            store: store.map(SharedStore::new),
            host: HostPort::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    #[cfg(test)]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    #[cfg(test)]
    pub fn store(&self) -> Option<&SharedStore> {
        self.store.as_ref()
    }

    /// Notification channel to host clients
    pub fn host(&self) -> &HostPort {
        &self.host
    }

    /// Pre-populate the static partition with the configured asset list
    pub async fn handle_install(&self) -> Result<usize> {
        let store = self.store.as_ref().ok_or(StoreError::Unavailable)?;
        let urls = self.config.precache_urls()?;
        ensure_populated(store, &self.fetcher, &self.config.partitions.static_name, &urls).await
    }

    /// Answer one intercepted request.
    ///
    /// Only the static strategy can fail (network failure on a miss); the API
    /// strategy always produces a response.
    pub async fn handle_fetch(&self, request: &ProxyRequest) -> std::result::Result<HttpResponse, FetchError> {
        if request.method != Method::GET {
            log::debug!("Passing through {} {}", request.method, request.url);
            return self.fetcher.fetch(request).await;
        }

        match classify(&request.url, &self.config.api_hosts) {
            RequestClass::Api => Ok(ApiStrategy {
                store: self.store.as_ref(),
                fetcher: &self.fetcher,
                partition: &self.config.partitions.api_name,
                ttl: self.config.ttl(),
            }
            .serve(request)
            .await),
            RequestClass::Static => {
                StaticStrategy {
                    store: self.store.as_ref(),
                    fetcher: &self.fetcher,
                    partition: &self.config.partitions.static_name,
                }
                .serve(request)
                .await
            }
        }
    }

    /// React to a scheduling signal.
    ///
    /// Only the configured sync tag starts a background refresh. A failed run
    /// is logged and yields `None`; there is no caller to report it to.
    pub async fn handle_sync(&self, tag: &str) -> Option<RefreshReport> {
        if tag != self.config.sync_tag {
            log::debug!("Ignoring sync tag '{}'", tag);
            return None;
        }

        let orchestrator = RefreshOrchestrator {
            config: &self.config,
            fetcher: &self.fetcher,
            host: &self.host,
            store: self.store.as_ref(),
        };

        match orchestrator.run().await {
            Ok(report) => Some(report),
            Err(e) => {
                log::error!("Background refresh failed: {}", e);
                None
            }
        }
    }
}
