//! reqwest-backed fetcher

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use super::{Fetcher, HttpResponse, ProxyRequest};
use crate::error::FetchError;

/// Live network fetcher.
///
/// No request timeout is configured; a hung upstream is bounded only by the
/// transport.
pub struct HttpFetcher {
    http: HttpClient,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let http = HttpClient::builder()
            .user_agent(concat!("newscache/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &ProxyRequest) -> Result<HttpResponse, FetchError> {
        let mut builder = self.http.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| match value.to_str() {
                Ok(v) => Some((name.as_str().to_string(), v.to_string())),
                Err(_) => {
                    log::debug!("Dropping non-ASCII header {} from {}", name, request.url);
                    None
                }
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        log::debug!(
            "{} {} -> {} ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            body.len()
        );

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}
