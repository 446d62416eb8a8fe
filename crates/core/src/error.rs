//! Unified error types for ogp-server.
//!
//! None of these reach an HTTP client: the cache and the lookup path log
//! them and carry on as if the image was simply not found.

use std::path::Path;

/// Unified error types for the ogp-server crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Cache file exists but could not be read.
    #[error("HYDRATE_FAILED: {0}")]
    HydrateFailed(String),

    /// Cache file contents are not a valid mapping.
    #[error("MALFORMED_CACHE: {0}")]
    MalformedCache(String),

    /// Writing or renaming the cache file failed.
    #[error("FLUSH_FAILED: {0}")]
    FlushFailed(String),

    /// The in-memory mapping could not be serialized.
    #[error("SERIALIZE_FAILED: {0}")]
    SerializeFailed(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// SSRF blocked - private/internal address not allowed.
    #[error("SSRF_BLOCKED: {0}")]
    SsrfBlocked(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP error response.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// The page was fetched but carries no Open Graph image.
    #[error("NO_IMAGE: {0}")]
    NoImage(String),
}

impl Error {
    pub(crate) fn hydrate(path: &Path, err: impl std::fmt::Display) -> Self {
        Error::HydrateFailed(format!("{}: {err}", path.display()))
    }

    pub(crate) fn malformed(path: &Path, err: impl std::fmt::Display) -> Self {
        Error::MalformedCache(format!("{}: {err}", path.display()))
    }

    pub(crate) fn flush(path: &Path, err: impl std::fmt::Display) -> Self {
        Error::FlushFailed(format!("{}: {err}", path.display()))
    }

    /// Whether this error came from resolving a page rather than from the cache file.
    pub fn is_resolve_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl(_)
                | Error::SsrfBlocked(_)
                | Error::FetchTimeout(_)
                | Error::FetchTooLarge(_)
                | Error::HttpError(_)
                | Error::NoImage(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializeFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NoImage("https://example.com/".to_string());
        assert!(err.to_string().contains("NO_IMAGE"));
        assert!(err.to_string().contains("example.com"));
    }

    #[test]
    fn test_error_path_context() {
        let err = Error::flush(Path::new("/tmp/ogp.cache"), "disk full");
        assert_eq!(err.to_string(), "FLUSH_FAILED: /tmp/ogp.cache: disk full");
        assert!(!err.is_resolve_error());
    }

    #[test]
    fn test_resolve_error_kinds() {
        assert!(Error::HttpError("status 500".into()).is_resolve_error());
        assert!(Error::SsrfBlocked("127.0.0.1".into()).is_resolve_error());
        assert!(!Error::MalformedCache("x".into()).is_resolve_error());
    }
}
