//! Resolver double for lookup and routing tests.

use async_trait::async_trait;
use ogp_client::{MetadataResolver, OpenGraph};
use ogp_core::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// Answers every page with a fixed image list, or fails every time.
pub struct StubResolver {
    images: Option<Vec<String>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubResolver {
    pub fn with_images(urls: &[&str]) -> Self {
        Self {
            images: Some(urls.iter().map(|u| u.to_string()).collect()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self { images: None, delay: Duration::ZERO, calls: AtomicUsize::new(0) }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataResolver for StubResolver {
    async fn resolve(&self, url: &Url) -> Result<OpenGraph, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.images {
            Some(images) => Ok(OpenGraph { images: images.clone(), ..Default::default() }),
            None => Err(Error::HttpError(format!("status 503 for {url}"))),
        }
    }
}
