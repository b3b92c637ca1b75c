//! Request classification by URL

use std::fmt;

/// Which strategy serves a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestClass {
    /// Cache-first static asset
    Static,
    /// Freshness-checked feed aggregation call
    Api,
}

impl RequestClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestClass::Static => "static",
            RequestClass::Api => "api",
        }
    }
}

impl fmt::Display for RequestClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a request URL.
///
/// `Api` when the URL's host is one of `api_hosts` or a subdomain of one;
/// everything else, including strings that do not parse as URLs, is `Static`.
pub fn classify(url: &str, api_hosts: &[String]) -> RequestClass {
    let Ok(parsed) = url::Url::parse(url) else {
        return RequestClass::Static;
    };
    let Some(host) = parsed.host_str() else {
        return RequestClass::Static;
    };
    let host = host.to_ascii_lowercase();

    let matches = api_hosts.iter().any(|pattern| {
        let pattern = pattern.trim().trim_end_matches('.').to_ascii_lowercase();
        !pattern.is_empty()
            && (host == pattern
                || host
                    .strip_suffix(pattern.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.')))
    });

    if matches {
        RequestClass::Api
    } else {
        RequestClass::Static
    }
}
