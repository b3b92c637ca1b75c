//! Configuration management for newscache
//!
//! Every name the proxy depends on (partition names, TTL, manifest and proxy
//! URLs, API host patterns, the pre-cache list) lives here and is passed into
//! [`crate::proxy::Proxy`] at construction.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Placeholder in `proxy_url_template` replaced by the encoded feed URL
pub const URL_PLACEHOLDER: &str = "{url}";

const DEFAULT_MANIFEST_URL: &str =
    "https://raw.githubusercontent.com/LaxmanNepal/LaxmanNepalApps/refs/heads/main/News/feeds.json";
const DEFAULT_PROXY_TEMPLATE: &str = "https://api.allorigins.win/raw?url={url}";

/// Everything except the URI component unreserved marks is escaped
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Origin that root-relative static paths are resolved against
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Resource store partition names
    #[serde(default)]
    pub partitions: Partitions,

    /// Freshness window for API responses
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Remote feed list
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,

    /// Aggregation-proxy URL for a single feed, with `{url}` placeholder
    #[serde(default = "default_proxy_template")]
    pub proxy_url_template: String,

    /// Hosts whose requests go through the API strategy
    #[serde(default = "default_api_hosts")]
    pub api_hosts: Vec<String>,

    /// Root-relative paths pre-populated into the static partition
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Scheduling tag that triggers a background refresh
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// Override for the store directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Background refresh tuning
    #[serde(default)]
    pub refresh: RefreshSettings,
}

/// Partition names. Changing either name on deploy starts that partition empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partitions {
    #[serde(default = "default_static_name")]
    pub static_name: String,

    #[serde(default = "default_api_name")]
    pub api_name: String,
}

impl Default for Partitions {
    fn default() -> Self {
        Self {
            static_name: default_static_name(),
            api_name: default_api_name(),
        }
    }
}

/// Background refresh settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshSettings {
    /// Cap on concurrent feed fetches (unbounded when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent: Option<usize>,

    /// Store successfully refreshed feeds in the API partition
    #[serde(default)]
    pub warm_api_partition: bool,
}

fn default_origin() -> String {
    "http://localhost:8080".to_string()
}

fn default_ttl_seconds() -> u64 {
    15 * 60
}

fn default_manifest_url() -> String {
    DEFAULT_MANIFEST_URL.to_string()
}

fn default_proxy_template() -> String {
    DEFAULT_PROXY_TEMPLATE.to_string()
}

fn default_api_hosts() -> Vec<String> {
    vec![
        "api.allorigins.win".to_string(),
        "raw.githubusercontent.com".to_string(),
    ]
}

fn default_precache() -> Vec<String> {
    vec!["/".to_string(), "/styles.css".to_string(), "/app.js".to_string()]
}

fn default_sync_tag() -> String {
    "news-update".to_string()
}

fn default_static_name() -> String {
    "nepali-news-v1".to_string()
}

fn default_api_name() -> String {
    "news-api-v1".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            partitions: Partitions::default(),
            ttl_seconds: default_ttl_seconds(),
            manifest_url: default_manifest_url(),
            proxy_url_template: default_proxy_template(),
            api_hosts: default_api_hosts(),
            precache: default_precache(),
            sync_tag: default_sync_tag(),
            cache_dir: None,
            refresh: RefreshSettings::default(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".newscache").join("config.yaml"))
    }

    /// Resolve the config path from an optional override
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from an optional override path.
    ///
    /// A missing file is not an error: defaults are used.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        Self::load_from(&Self::resolve_path(path)?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Reject configurations the proxy cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.ttl_seconds == 0 {
            return Err(ConfigError::Invalid("ttl_seconds must be positive".to_string()).into());
        }
        if !self.proxy_url_template.contains(URL_PLACEHOLDER) {
            return Err(ConfigError::Invalid(format!(
                "proxy_url_template must contain {}",
                URL_PLACEHOLDER
            ))
            .into());
        }
        url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid(format!("origin '{}': {}", self.origin, e)))?;
        url::Url::parse(&self.manifest_url).map_err(|e| {
            ConfigError::Invalid(format!("manifest_url '{}': {}", self.manifest_url, e))
        })?;
        if self.partitions.static_name == self.partitions.api_name {
            return Err(ConfigError::Invalid(
                "static and api partitions must have different names".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Freshness window for API responses
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Absolute URLs of the pre-cache list, resolved against `origin`
    pub fn precache_urls(&self) -> Result<Vec<String>> {
        let base = url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid(format!("origin '{}': {}", self.origin, e)))?;
        self.precache
            .iter()
            .map(|path| {
                base.join(path)
                    .map(|u| u.to_string())
                    .map_err(|e| ConfigError::Invalid(format!("precache '{}': {}", path, e)).into())
            })
            .collect()
    }

    /// Proxied fetch URL for one feed
    pub fn proxied_feed_url(&self, feed_url: &str) -> String {
        let encoded = utf8_percent_encode(feed_url, URI_COMPONENT).to_string();
        self.proxy_url_template.replace(URL_PLACEHOLDER, &encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ttl(), Duration::from_secs(900));
        assert_eq!(config.partitions.static_name, "nepali-news-v1");
        assert_eq!(config.partitions.api_name, "news-api-v1");
        assert_eq!(config.sync_tag, "news-update");
        assert_eq!(config.precache, vec!["/", "/styles.css", "/app.js"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.ttl_seconds, 900);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "ttl_seconds: 60\npartitions:\n  api_name: api-v2\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.ttl_seconds, 60);
        assert_eq!(config.partitions.api_name, "api-v2");
        assert_eq!(config.partitions.static_name, "nepali-news-v1");
        assert_eq!(config.api_hosts.len(), 2);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let mut config = Config::default();
        config.refresh.warm_api_partition = true;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(loaded.refresh.warm_api_partition);
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let config = Config {
            ttl_seconds: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_template_without_placeholder() {
        let config = Config {
            proxy_url_template: "https://proxy.example/raw".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_shared_partition_name() {
        let mut config = Config::default();
        config.partitions.api_name = config.partitions.static_name.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_precache_urls_resolve_against_origin() {
        let config = Config {
            origin: "https://news.example.com".to_string(),
            ..Config::default()
        };
        let urls = config.precache_urls().unwrap();
        assert_eq!(
            urls,
            vec![
                "https://news.example.com/",
                "https://news.example.com/styles.css",
                "https://news.example.com/app.js",
            ]
        );
    }

    #[test]
    fn test_proxied_feed_url_encodes_feed() {
        let config = Config::default();
        let url = config.proxied_feed_url("https://example.com/rss?cat=1&x=a b");
        assert_eq!(
            url,
            "https://api.allorigins.win/raw?url=https%3A%2F%2Fexample.com%2Frss%3Fcat%3D1%26x%3Da%20b"
        );
    }

    #[test]
    fn test_proxied_feed_url_keeps_unreserved_marks() {
        let config = Config::default();
        let url = config.proxied_feed_url("https://a.test/news feed(1)~x!*'");
        assert_eq!(
            url,
            "https://api.allorigins.win/raw?url=https%3A%2F%2Fa.test%2Fnews%20feed(1)~x!*'"
        );
    }
}
