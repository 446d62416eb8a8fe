//! Open Graph meta tag harvesting from HTML documents.

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

use ogp_core::CachedImage;

/// Open Graph properties of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenGraph {
    /// `og:title`
    pub title: Option<String>,
    /// `og:site_name`
    pub site_name: Option<String>,
    /// `og:description`
    pub description: Option<String>,
    /// `og:image` / `og:image:url` values, absolute, in document order.
    pub images: Vec<String>,
}

impl OpenGraph {
    /// Cacheable image value: one URL, a list when the page declares several,
    /// or `None` when it declares none.
    pub fn image(&self) -> Option<CachedImage> {
        CachedImage::from_urls(self.images.clone())
    }
}

/// Extract Open Graph properties from an HTML document.
///
/// Both `property=` and `name=` attributes are accepted. Image URLs are
/// resolved against `base_url`, deduplicated, and limited to http(s). For
/// the text properties the first non-empty tag wins.
pub fn parse_open_graph(html: &str, base_url: &Url) -> OpenGraph {
    let document = Html::parse_document(html);
    let selector = Selector::parse("meta[content]").expect("invalid selector");

    let mut og = OpenGraph::default();
    let mut seen = HashSet::new();

    for element in document.select(&selector) {
        let meta = element.value();
        let Some(property) = meta.attr("property").or_else(|| meta.attr("name")) else {
            continue;
        };

        let content = meta.attr("content").unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        match property.trim().to_ascii_lowercase().as_str() {
            "og:image" | "og:image:url" => {
                let Ok(resolved) = base_url.join(content) else {
                    continue;
                };
                if !matches!(resolved.scheme(), "http" | "https") {
                    continue;
                }
                let resolved = resolved.to_string();
                if seen.insert(resolved.clone()) {
                    og.images.push(resolved);
                }
            }
            "og:title" => {
                og.title.get_or_insert_with(|| content.to_string());
            }
            "og:site_name" => {
                og.site_name.get_or_insert_with(|| content.to_string());
            }
            "og:description" => {
                og.description.get_or_insert_with(|| content.to_string());
            }
            _ => {}
        }
    }

    og
}
