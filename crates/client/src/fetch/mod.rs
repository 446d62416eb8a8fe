//! HTTP fetch pipeline with SSRF protection.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments
//! - Destination keys drop scheme, query and trailing slashes
//!
//! ### SSRF & Safety Gates
//! - Deny private ranges (RFC1918, link-local, localhost, etc.)
//! - Resolve DNS and validate all A/AAAA answers are public.
//! - Redirects to literal private addresses are refused.
//! - Max redirects: 5
//! - Max body bytes: 2MB (configurable)

pub mod ssrf;
pub mod url;

use bytes::{Bytes, BytesMut};
use reqwest::Url;
use reqwest::{Client, StatusCode, header, redirect};
use std::time::{Duration, Instant};

pub use self::ssrf::{SsrfError, check_host, validate_ip};
pub use self::url::{Destination, UrlError, canonicalize};

use ogp_core::{AppConfig, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "ogp-server/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 2MB)
    pub max_bytes: usize,

    /// Request timeout (default: 10s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Skip the SSRF checks (default: false)
    pub allow_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "ogp-server/0.1".to_string(),
            max_bytes: 2 * 1024 * 1024,
            timeout: Duration::from_millis(10_000),
            max_redirects: 5,
            allow_private_hosts: false,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            allow_private_hosts: config.allow_private_hosts,
            ..Default::default()
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Whether the response declares an HTML (or untyped) body.
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            None => true,
            Some(ct) => {
                let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
                mime == "text/html" || mime == "application/xhtml+xml"
            }
        }
    }
}

/// HTTP fetch client with safety checks.
#[derive(Debug)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let max_redirects = config.max_redirects;
        let allow_private = config.allow_private_hosts;
        let policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= max_redirects {
                attempt.error("too many redirects")
            } else if !allow_private && ssrf::is_literal_private(attempt.url()) {
                attempt.error("redirect to private address")
            } else {
                attempt.follow()
            }
        });

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(policy)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Fetch a URL, returning raw bytes and metadata.
    ///
    /// Performs the SSRF check and respects redirect/byte limits.
    pub async fn fetch(&self, url_str: &str) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = canonicalize(url_str).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        if !self.config.allow_private_hosts {
            check_host(&url).await.map_err(|e| Error::SsrfBlocked(e.to_string()))?;
        }

        let mut response = self
            .http
            .get(url.as_str())
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::FetchTimeout(format!("{url}: {e}"))
                } else {
                    Error::HttpError(format!("network error: {}", e))
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            return Err(Error::HttpError(format!("status {}", status.as_u16())));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        // Content-Length may be absent (chunked or compressed), so count while reading.
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{url}: {e}"))
            } else {
                Error::HttpError(format!("failed to read response: {}", e))
            }
        })? {
            if body.len() + chunk.len() > self.config.max_bytes {
                return Err(Error::FetchTooLarge(format!(
                    "body exceeds {} bytes",
                    self.config.max_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }
        let bytes = body.freeze();

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            url,
            final_url,
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url, final_url, status, content_type, bytes, fetch_ms })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}
