//! Persistent write-back cache for resolved preview images.
//!
//! This module provides a JSON-file backed key-value cache. It supports:
//!
//! - Best-effort hydration from disk that never blocks `get`/`put`
//! - Dirty tracking with explicit or timer-driven commits
//! - Serialized, temp-file-and-rename flushes
//! - A no-op variant for when persistence is disabled

pub mod null;
pub mod selector;
pub mod store;
pub mod value;

pub use crate::Error;

pub use null::NullCache;
pub use selector::{CacheConfig, SelectedCache, select_cache};
pub use store::{AutocommitHandle, CacheStore, DEFAULT_AUTOCOMMIT};
pub use value::CachedImage;

/// Key-value capability shared by every cache variant.
///
/// Implement this to inject an externally owned cache into the server.
/// Neither method may block on I/O: lookups call them on the request path.
pub trait ImageCache: Send + Sync {
    /// Stored value for `key`, if any.
    fn get(&self, key: &str) -> Option<CachedImage>;

    /// Store `value` under `key` when it is truthy. Absent or empty values
    /// are ignored; there is no deletion.
    fn put(&self, key: &str, value: Option<CachedImage>);
}
