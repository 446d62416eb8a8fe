//! Cache used when persistence is disabled.

use super::{CachedImage, ImageCache};

/// Remembers nothing: every lookup misses and every write is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

impl ImageCache for NullCache {
    fn get(&self, _key: &str) -> Option<CachedImage> {
        None
    }

    fn put(&self, _key: &str, _value: Option<CachedImage>) {}
}
