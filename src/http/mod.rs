//! Request/response records and the network fetch seam
//!
//! Strategies and the refresh orchestrator never talk to reqwest directly;
//! they go through [`Fetcher`] so tests can substitute a double.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::store::key::resource_key;

pub mod client;
#[cfg(test)]
pub mod mock;

pub use client::HttpFetcher;
#[cfg(test)]
pub use mock::MockFetcher;

/// Network fetch abstraction
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform one live request.
    ///
    /// Any HTTP status is `Ok`; only transport failures are `Err`. Callers
    /// that treat non-2xx as failure use [`HttpResponse::error_for_status`].
    async fn fetch(&self, request: &ProxyRequest) -> Result<HttpResponse, FetchError>;
}

/// An intercepted outbound request
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl ProxyRequest {
    /// Plain GET with no extra headers
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Add a request header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Store key for this request's identity (method + URL)
    pub fn cache_key(&self) -> String {
        resource_key(self.method.as_str(), &self.url)
    }
}

/// Captured HTTP response.
///
/// Treated as an immutable record: [`HttpResponse::with_header`] derives a new
/// value instead of mutating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Copy of this response with `name` set to `value`, replacing any
    /// existing header of the same name (case-insensitive).
    pub fn with_header(&self, name: &str, value: &str) -> Self {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case(name))
            .cloned()
            .collect();
        headers.push((name.to_string(), value.to_string()));

        Self {
            headers,
            ..self.clone()
        }
    }

    /// First value of a header, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into a [`FetchError::Status`]
    pub fn error_for_status(self, url: &str) -> Result<Self, FetchError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FetchError::Status {
                status: self.status,
                url: url.to_string(),
            })
        }
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Case-insensitive header lookup over a raw header list
pub fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HttpResponse {
        let mut response = HttpResponse::new(200, "OK", "<rss/>");
        response.headers = vec![
            ("Content-Type".to_string(), "application/xml".to_string()),
            ("ETag".to_string(), "\"abc\"".to_string()),
        ];
        response
    }

    #[test]
    fn test_with_header_leaves_original_untouched() {
        let original = sample();
        let stamped = original.with_header("x-cache-time", "2024-01-01T00:00:00Z");

        assert!(original.header("x-cache-time").is_none());
        assert_eq!(stamped.header("x-cache-time"), Some("2024-01-01T00:00:00Z"));
        assert_eq!(stamped.body, original.body);
        assert_eq!(stamped.status, original.status);
    }

    #[test]
    fn test_with_header_replaces_case_insensitively() {
        let response = sample().with_header("content-type", "text/xml");

        let content_types: Vec<_> = response
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .collect();
        assert_eq!(content_types.len(), 1);
        assert_eq!(response.header("Content-Type"), Some("text/xml"));
        assert_eq!(response.header("etag"), Some("\"abc\""));
    }

    #[test]
    fn test_error_for_status() {
        assert!(sample().error_for_status("https://a").is_ok());

        let err = HttpResponse::new(404, "Not Found", "")
            .error_for_status("https://a/missing")
            .unwrap_err();
        match err {
            FetchError::Status { status, url } => {
                assert_eq!(status, 404);
                assert_eq!(url, "https://a/missing");
            }
            _ => panic!("Expected FetchError::Status"),
        }
    }

    #[test]
    fn test_cache_key_depends_on_method_and_url() {
        let get = ProxyRequest::get("https://example.com/a");
        let same = ProxyRequest::get("https://example.com/a").header("Accept", "text/xml");
        let other = ProxyRequest::get("https://example.com/b");

        assert_eq!(get.cache_key(), same.cache_key());
        assert_ne!(get.cache_key(), other.cache_key());
    }
}
