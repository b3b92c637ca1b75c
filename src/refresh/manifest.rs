//! Feed manifest and fetched feed documents

use serde::{Deserialize, Serialize};

use crate::error::RefreshError;

/// One entry of the remote feed list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedDescriptor {
    /// Feed location
    pub url: String,

    /// Every other field of the manifest entry (name, category, ...)
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl FeedDescriptor {
    /// Display name from metadata, falling back to the URL
    pub fn label(&self) -> &str {
        self.metadata
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or(self.url.as_str())
    }
}

/// Parse a manifest body: a JSON array of objects with at least `url`
pub fn parse_manifest(body: &[u8]) -> Result<Vec<FeedDescriptor>, RefreshError> {
    serde_json::from_slice(body).map_err(|e| RefreshError::ManifestFormat(e.to_string()))
}

/// A feed that fetched and parsed as XML
#[derive(Debug, Clone, Serialize)]
pub struct FeedDocument {
    pub feed: FeedDescriptor,
    /// Root element name (`rss`, `feed`, `rdf:RDF` ...)
    pub root: String,
    /// Channel or feed title, when present
    pub title: Option<String>,
    /// Number of `item`/`entry` elements
    pub items: usize,
}

impl FeedDocument {
    /// Parse feed text as an XML document tree
    pub fn parse(feed: FeedDescriptor, text: &str) -> Result<Self, RefreshError> {
        // Legacy RSS 0.91 feeds still carry a DOCTYPE
        let mut options = roxmltree::ParsingOptions::default();
        options.allow_dtd = true;
        let doc = roxmltree::Document::parse_with_options(text, options)
            .map_err(|e| RefreshError::FeedParse(format!("{}: {}", feed.url, e)))?;

        let root = doc.root_element();
        let root_name = match root.tag_name().namespace().and_then(|ns| root.lookup_prefix(ns)) {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, root.tag_name().name()),
            _ => root.tag_name().name().to_string(),
        };

        let title = doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == "title")
            .and_then(|n| n.text())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let items = doc
            .descendants()
            .filter(|n| n.is_element() && matches!(n.tag_name().name(), "item" | "entry"))
            .count();

        Ok(Self {
            feed,
            root: root_name,
            title,
            items,
        })
    }
}
