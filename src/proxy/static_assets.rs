//! Cache-first strategy for the app's own static assets

use crate::error::FetchError;
use crate::http::{Fetcher, HttpResponse, ProxyRequest};
use crate::store::SharedStore;

/// Serves from the static partition, falling back to the network on a miss.
///
/// Misses are never written back; only install populates this partition.
pub struct StaticStrategy<'a, F: Fetcher + ?Sized> {
    pub store: Option<&'a SharedStore>,
    pub fetcher: &'a F,
    pub partition: &'a str,
}

impl<F: Fetcher + ?Sized> StaticStrategy<'_, F> {
    pub async fn serve(&self, request: &ProxyRequest) -> Result<HttpResponse, FetchError> {
        if let Some(store) = self.store {
            match store.get(self.partition, &request.cache_key()) {
                Ok(Some(cached)) => {
                    log::debug!("Static hit: {}", request.url);
                    return Ok(cached.response);
                }
                Ok(None) => log::debug!("Static miss: {}", request.url),
                Err(e) => log::warn!("Static lookup failed for {}: {}", request.url, e),
            }
        }

        self.fetcher.fetch(request).await
    }
}
