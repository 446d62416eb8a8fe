//! HTTP request handler.
//!
//! Routes on the request path only:
//! - `/ping` answers a liveness probe
//! - `/image` looks up the preview image for `domain`
//! - everything else is 404

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, HeaderValue, LOCATION};
use hyper::{Request, Response, StatusCode};
use ogp_client::Destination;
use std::sync::Arc;

use crate::lookup::{ImageFormat, ImageResponse, Lookup};

/// Query parameters of `/image`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImageParams {
    pub domain: Option<String>,
    pub fallback: Option<String>,
    pub format: ImageFormat,
}

impl ImageParams {
    /// Parse a raw query string. Values are percent-decoded and a repeated
    /// parameter keeps its last value.
    pub fn parse(query: Option<&str>) -> Self {
        let mut domain = None;
        let mut fallback = None;
        let mut format = None;

        for (name, value) in url::form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
            match name.as_ref() {
                "domain" => domain = Some(value.into_owned()),
                "fallback" => fallback = Some(value.into_owned()),
                "format" => format = Some(value.into_owned()),
                _ => {}
            }
        }

        Self { domain, fallback, format: ImageFormat::from_param(format.as_deref()) }
    }
}

/// The ogp-server request handler. Cheap to clone per connection.
#[derive(Clone)]
pub struct OgpServer {
    lookup: Arc<Lookup>,
}

impl OgpServer {
    pub fn new(lookup: Lookup) -> Self {
        Self { lookup: Arc::new(lookup) }
    }

    /// Answer one request. Never fails: every problem degrades to a 404.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>> {
        let uri = req.uri().clone();
        drop(req);

        match uri.path() {
            "/ping" => text(StatusCode::OK, "i am alive"),
            "/image" => self.image(ImageParams::parse(uri.query())).await,
            path => {
                tracing::debug!("no route for {}", path);
                not_found()
            }
        }
    }

    async fn image(&self, params: ImageParams) -> Response<Full<Bytes>> {
        let Some(domain) = params.domain.as_deref().filter(|d| !d.is_empty()) else {
            return not_found();
        };

        let image = match Destination::parse(domain) {
            Ok(dest) => self.lookup.image(&dest).await,
            Err(e) => {
                tracing::debug!(domain, error = %e, "unusable domain parameter");
                None
            }
        };

        match ImageResponse::build(image, params.fallback.as_deref(), params.format) {
            ImageResponse::Redirect(url) => redirect(&url),
            ImageResponse::Json(urls) => json(&urls),
            ImageResponse::NotFound => not_found(),
        }
    }
}

fn response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

fn text(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = response(status, body);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

fn not_found() -> Response<Full<Bytes>> {
    response(StatusCode::NOT_FOUND, Bytes::new())
}

fn redirect(url: &str) -> Response<Full<Bytes>> {
    let Ok(location) = HeaderValue::from_str(url) else {
        tracing::warn!(url, "image URL is not a valid Location header");
        return not_found();
    };

    let mut response = response(StatusCode::MOVED_PERMANENTLY, Bytes::new());
    response.headers_mut().insert(LOCATION, location);
    response
}

fn json(urls: &[String]) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "images": urls }).to_string();
    let mut response = response(StatusCode::OK, body);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubResolver;
    use http_body_util::BodyExt;
    use ogp_core::cache::{CacheStore, CachedImage, ImageCache, NullCache};

    fn server_with(cache: Arc<dyn ImageCache>, resolver: Arc<StubResolver>) -> OgpServer {
        OgpServer::new(Lookup::new(cache, resolver))
    }

    async fn get(server: &OgpServer, uri: &str) -> Response<Full<Bytes>> {
        server.handle(Request::get(uri).body(()).unwrap()).await
    }

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response<Full<Bytes>>) -> Option<&str> {
        response.headers().get(LOCATION).and_then(|v| v.to_str().ok())
    }

    async fn prepopulated_store(dir: &tempfile::TempDir) -> CacheStore {
        let store = CacheStore::open(dir.path().join("ogp.cache"));
        store.hydrated().await;
        store.put("example.com", Some(CachedImage::from("http://img/a.png")));
        store
    }

    #[test]
    fn test_params_parse() {
        let params = ImageParams::parse(Some(
            "domain=http%3A%2F%2Fexample.com%2Fa%3Fb%3D1&format=json&fallback=http://default.png&x=1",
        ));
        assert_eq!(params.domain.as_deref(), Some("http://example.com/a?b=1"));
        assert_eq!(params.fallback.as_deref(), Some("http://default.png"));
        assert_eq!(params.format, ImageFormat::Json);
    }

    #[test]
    fn test_params_parse_empty() {
        assert_eq!(ImageParams::parse(None), ImageParams::default());
        assert_eq!(ImageParams::parse(Some("domain")).domain.as_deref(), Some(""));
        assert_eq!(ImageParams::parse(Some("domain=a&domain=b")).domain.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_ping() {
        let server = server_with(Arc::new(NullCache), Arc::new(StubResolver::failing()));
        let response = get(&server, "/ping").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "i am alive");
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let server = server_with(Arc::new(NullCache), Arc::new(StubResolver::failing()));
        assert_eq!(get(&server, "/").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(get(&server, "/images?domain=example.com").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cache_hit_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = prepopulated_store(&dir).await;
        let resolver = Arc::new(StubResolver::failing());
        let server = server_with(Arc::new(store), resolver.clone());

        let response = get(&server, "/image?domain=http://example.com&format=json").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        assert_eq!(body_string(response).await, r#"{"images":["http://img/a.png"]}"#);
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_redirect() {
        let dir = tempfile::tempdir().unwrap();
        let store = prepopulated_store(&dir).await;
        let server = server_with(Arc::new(store), Arc::new(StubResolver::failing()));

        let response = get(&server, "/image?domain=https%3A%2F%2Fexample.com%2F").await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location(&response), Some("http://img/a.png"));
    }

    #[tokio::test]
    async fn test_miss_with_fallback_redirects() {
        let server = server_with(Arc::new(NullCache), Arc::new(StubResolver::failing()));

        let response = get(&server, "/image?domain=http://x&fallback=http://default.png").await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location(&response), Some("http://default.png"));
    }

    #[tokio::test]
    async fn test_miss_with_fallback_json() {
        let server = server_with(Arc::new(NullCache), Arc::new(StubResolver::failing()));

        let response = get(&server, "/image?domain=http://x&fallback=http://default.png&format=json").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"images":["http://default.png"]}"#);
    }

    #[tokio::test]
    async fn test_miss_without_fallback() {
        let server = server_with(Arc::new(NullCache), Arc::new(StubResolver::failing()));

        let response = get(&server, "/image?domain=http://x").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = get(&server, "/image?domain=http://x&fallback=").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_domain() {
        let resolver = Arc::new(StubResolver::with_images(&["http://img/a.png"]));
        let server = server_with(Arc::new(NullCache), resolver.clone());

        assert_eq!(get(&server, "/image").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(get(&server, "/image?domain=").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            get(&server, "/image?fallback=http://default.png").await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_domain_uses_fallback() {
        let resolver = Arc::new(StubResolver::with_images(&["http://img/a.png"]));
        let server = server_with(Arc::new(NullCache), resolver.clone());

        let response = get(&server, "/image?domain=ftp://example.com&fallback=http://default.png").await;
        assert_eq!(location(&response), Some("http://default.png"));
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_resolves_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path().join("ogp.cache"));
        store.hydrated().await;
        let resolver = Arc::new(StubResolver::with_images(&["http://img/a.png", "http://img/b.png"]));
        let server = server_with(Arc::new(store.clone()), resolver.clone());

        let response = get(&server, "/image?domain=example.com/gallery").await;
        assert_eq!(location(&response), Some("http://img/a.png"));

        let response = get(&server, "/image?domain=https://example.com/gallery&format=json").await;
        assert_eq!(body_string(response).await, r#"{"images":["http://img/a.png","http://img/b.png"]}"#);

        assert_eq!(resolver.calls(), 1);
        assert!(store.get("example.com/gallery").unwrap().is_list());
    }

    #[tokio::test]
    async fn test_invalid_location_is_not_found() {
        let server = server_with(Arc::new(NullCache), Arc::new(StubResolver::failing()));
        let response = get(&server, "/image?domain=http://x&fallback=http://bad%0Aheader").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
