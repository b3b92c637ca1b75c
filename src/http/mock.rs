//! Mock fetcher for testing
//!
//! Serves canned responses per URL and records every request so tests can
//! assert on how many network calls were made.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{Fetcher, HttpResponse, ProxyRequest};
use crate::error::FetchError;

/// Mock network for testing.
///
/// # Example
/// ```ignore
/// let mock = MockFetcher::new()
///     .with_response("https://a.test/x", HttpResponse::new(200, "OK", "body"))
///     .await;
/// ```
#[derive(Default)]
pub struct MockFetcher {
    /// Canned outcome per URL; unknown URLs fail as a network error
    routes: Arc<Mutex<HashMap<String, Result<HttpResponse, FetchError>>>>,
    /// URLs requested, in call order
    requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    /// Create a mock that fails every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` for `url`.
    pub async fn with_response(self, url: &str, response: HttpResponse) -> Self {
        self.routes
            .lock()
            .await
            .insert(url.to_string(), Ok(response));
        self
    }

    /// Serve a 200 with `body` for `url`.
    pub async fn with_body(self, url: &str, body: &str) -> Self {
        self.with_response(url, HttpResponse::new(200, "OK", body))
            .await
    }

    /// Fail `url` with a transport error.
    pub async fn with_failure(self, url: &str) -> Self {
        self.routes.lock().await.insert(
            url.to_string(),
            Err(FetchError::Network(format!("connection reset: {}", url))),
        );
        self
    }

    /// Total number of fetches made.
    pub async fn call_count(&self) -> usize {
        self.requested.lock().await.len()
    }

    /// Number of fetches made for `url`.
    pub async fn calls_for(&self, url: &str) -> usize {
        self.requested
            .lock()
            .await
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &ProxyRequest) -> Result<HttpResponse, FetchError> {
        self.requested.lock().await.push(request.url.clone());

        match self.routes.lock().await.get(&request.url) {
            Some(outcome) => outcome.clone(),
            None => Err(FetchError::Network(format!(
                "no mock route for {}",
                request.url
            ))),
        }
    }
}
