//! URL canonicalization and cache keys for destination pages.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a URL string for consistent caching and safety checks.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// A page whose preview image is requested.
///
/// The cache key ignores scheme, query and trailing slashes, so
/// `http://example.com` and `https://EXAMPLE.com/?ref=x` share the key
/// `example.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    url: Url,
    key: String,
}

impl Destination {
    /// Canonicalize `input` and derive its cache key.
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let mut url = canonicalize(input)?;
        url.set_query(None);

        let host = url
            .host_str()
            .ok_or_else(|| UrlError::InvalidUrl(format!("missing host: {url}")))?;

        let mut key = host.to_string();
        if let Some(port) = url.port() {
            key.push(':');
            key.push_str(&port.to_string());
        }
        key.push_str(url.path().trim_end_matches('/'));

        Ok(Self { url, key })
    }

    /// URL to fetch, without query or fragment.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Cache key for this page.
    pub fn key(&self) -> &str {
        &self.key
    }
}
