//! Cached preview image values.

use serde::{Deserialize, Serialize};

/// A resolved preview image: one URL, or every image a page advertises.
///
/// Serialized untagged, so the cache file holds either a JSON string or an
/// array of strings per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CachedImage {
    Single(String),
    Many(Vec<String>),
}

impl CachedImage {
    /// Build a value from a list of URLs, collapsing one element to `Single`.
    ///
    /// Returns `None` for an empty list.
    pub fn from_urls(mut urls: Vec<String>) -> Option<Self> {
        match urls.len() {
            0 => None,
            1 => urls.pop().map(CachedImage::Single),
            _ => Some(CachedImage::Many(urls)),
        }
    }

    /// Whether the value is worth storing: a non-empty URL or a non-empty list.
    pub fn is_truthy(&self) -> bool {
        match self {
            CachedImage::Single(url) => !url.is_empty(),
            CachedImage::Many(urls) => !urls.is_empty(),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, CachedImage::Many(_))
    }

    /// The URL to redirect to.
    pub fn first(&self) -> Option<&str> {
        match self {
            CachedImage::Single(url) => Some(url.as_str()),
            CachedImage::Many(urls) => urls.first().map(String::as_str),
        }
    }

    pub fn into_urls(self) -> Vec<String> {
        match self {
            CachedImage::Single(url) => vec![url],
            CachedImage::Many(urls) => urls,
        }
    }
}

impl From<&str> for CachedImage {
    fn from(url: &str) -> Self {
        CachedImage::Single(url.to_string())
    }
}

impl From<String> for CachedImage {
    fn from(url: String) -> Self {
        CachedImage::Single(url)
    }
}
