//! Preview image resolution from Open Graph metadata.
//!
//! ### Stable Abstraction
//! - Lookups depend on the `MetadataResolver` trait, not on the fetch stack,
//!   so tests and embedders can swap the resolver.
//!
//! ### Resolution
//! - Fetch the page through [`FetchClient`] (SSRF checks, size and time limits).
//! - Reject non-HTML responses.
//! - Harvest `og:*` meta tags; image URLs are made absolute against the final URL.

pub mod parse;

pub use parse::{OpenGraph, parse_open_graph};

use async_trait::async_trait;
use ogp_core::Error;
use url::Url;

use crate::fetch::{FetchClient, FetchConfig};

/// Source of Open Graph metadata for a page.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Fetch `url` and return its Open Graph properties.
    ///
    /// A page without images is a success with an empty `images` list.
    async fn resolve(&self, url: &Url) -> Result<OpenGraph, Error>;
}

/// Resolver that scrapes pages over HTTP.
#[derive(Debug)]
pub struct OpenGraphResolver {
    client: FetchClient,
}

impl OpenGraphResolver {
    /// Create a resolver with its own fetch client.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        Ok(Self { client: FetchClient::new(config)? })
    }

    pub fn with_client(client: FetchClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataResolver for OpenGraphResolver {
    async fn resolve(&self, url: &Url) -> Result<OpenGraph, Error> {
        let response = self.client.fetch(url.as_str()).await?;

        if !response.is_html() {
            return Err(Error::NoImage(format!(
                "{} is not an HTML page ({})",
                response.final_url,
                response.content_type.as_deref().unwrap_or("unknown")
            )));
        }

        let html = String::from_utf8_lossy(&response.bytes);
        let og = parse_open_graph(&html, &response.final_url);

        tracing::debug!(
            "resolved {} in {}ms: {} image(s)",
            response.final_url,
            response.fetch_ms,
            og.images.len()
        );

        Ok(og)
    }
}
