//! Cache-first preview image lookups.
//!
//! A miss triggers one resolution per destination key: concurrent requests
//! for the same page wait on the same in-flight task instead of each
//! scraping it. The task runs detached, so a dropped request never leaves
//! it half done.

use futures::future::{BoxFuture, FutureExt, Shared};
use ogp_client::{Destination, MetadataResolver};
use ogp_core::{CachedImage, ImageCache};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Pending = Shared<BoxFuture<'static, Option<CachedImage>>>;
type InFlight = Arc<Mutex<HashMap<String, Pending>>>;

/// Resolves preview images through the cache, populating it on misses.
pub struct Lookup {
    cache: Arc<dyn ImageCache>,
    resolver: Arc<dyn MetadataResolver>,
    in_flight: InFlight,
}

impl Lookup {
    pub fn new(cache: Arc<dyn ImageCache>, resolver: Arc<dyn MetadataResolver>) -> Self {
        Self { cache, resolver, in_flight: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Image for `dest`, from the cache or freshly resolved.
    ///
    /// Resolver failures are logged and reported as `None`, like a page
    /// without an image.
    pub async fn image(&self, dest: &Destination) -> Option<CachedImage> {
        if let Some(image) = self.cache.get(dest.key()) {
            tracing::debug!(key = dest.key(), "cache hit");
            return Some(image);
        }

        let pending = {
            let mut in_flight = lock(&self.in_flight);
            // A resolution may have landed between the first check and taking the lock.
            if let Some(image) = self.cache.get(dest.key()) {
                return Some(image);
            }
            in_flight
                .entry(dest.key().to_string())
                .or_insert_with(|| {
                    tracing::debug!(key = dest.key(), "cache miss, resolving {}", dest.url());
                    self.resolve(dest)
                })
                .clone()
        };

        pending.await
    }

    /// Number of resolutions currently running.
    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Start resolving `dest` on its own task and return a handle waiters can share.
    ///
    /// The task stores its result and clears its in-flight entry even when
    /// every request waiting on it has gone away.
    fn resolve(&self, dest: &Destination) -> Pending {
        let cache = Arc::clone(&self.cache);
        let resolver = Arc::clone(&self.resolver);
        let in_flight = Arc::clone(&self.in_flight);
        let key = dest.key().to_string();
        let url = dest.url().clone();

        let task = tokio::spawn({
            let key = key.clone();
            async move {
                let image = match resolver.resolve(&url).await {
                    Ok(og) => og.image(),
                    Err(e) if e.is_resolve_error() => {
                        tracing::warn!(key = %key, error = %e, "image resolution failed");
                        None
                    }
                    Err(e) => {
                        tracing::error!(key = %key, error = %e, "unexpected error while resolving");
                        None
                    }
                };

                cache.put(&key, image.clone());
                lock(&in_flight).remove(&key);
                image
            }
        });

        let in_flight = Arc::clone(&self.in_flight);
        task.map(move |joined| match joined {
            Ok(image) => image,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "resolution task failed");
                lock(&in_flight).remove(&key);
                None
            }
        })
        .boxed()
        .shared()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Response encoding requested through `format=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Redirect,
    Json,
}

impl ImageFormat {
    /// `json` selects JSON; anything else, including nothing, redirects.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("json") => ImageFormat::Json,
            _ => ImageFormat::Redirect,
        }
    }
}

/// What an `/image` request answers with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageResponse {
    Redirect(String),
    Json(Vec<String>),
    NotFound,
}

impl ImageResponse {
    /// Shape the looked-up value into a response.
    ///
    /// The fallback replaces a missing value before list detection, so a
    /// fallback always behaves as a single URL.
    pub fn build(image: Option<CachedImage>, fallback: Option<&str>, format: ImageFormat) -> Self {
        let image = image
            .filter(CachedImage::is_truthy)
            .or_else(|| fallback.filter(|url| !url.is_empty()).map(CachedImage::from));

        let Some(image) = image else {
            return ImageResponse::NotFound;
        };

        match format {
            ImageFormat::Json => ImageResponse::Json(image.into_urls()),
            ImageFormat::Redirect => match image.first() {
                Some(url) => ImageResponse::Redirect(url.to_string()),
                None => ImageResponse::NotFound,
            },
        }
    }
}
