//! Startup-time choice of cache implementation.

use super::{AutocommitHandle, CacheStore, ImageCache, NullCache};
use crate::config::ConfigError;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Shape of the `cache` configuration.
#[derive(Clone)]
pub enum CacheConfig {
    /// A cache owned by the embedder, used as-is.
    External(Arc<dyn ImageCache>),
    /// A [`CacheStore`] on `path`, committing every `autocommit` if set.
    File { path: PathBuf, autocommit: Option<Duration> },
    /// Caching disabled.
    Disabled,
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheConfig::External(_) => f.write_str("External(..)"),
            CacheConfig::File { path, autocommit } => f
                .debug_struct("File")
                .field("path", path)
                .field("autocommit", autocommit)
                .finish(),
            CacheConfig::Disabled => f.write_str("Disabled"),
        }
    }
}

/// The cache shared by every lookup, plus whatever the process owns behind it.
pub struct SelectedCache {
    cache: Arc<dyn ImageCache>,
    store: Option<CacheStore>,
    autocommit: Option<AutocommitHandle>,
}

impl SelectedCache {
    pub fn cache(&self) -> Arc<dyn ImageCache> {
        Arc::clone(&self.cache)
    }

    /// The file-backed store, when one was created.
    pub fn store(&self) -> Option<&CacheStore> {
        self.store.as_ref()
    }

    /// Stop autocommit and make a last best-effort commit.
    pub async fn shutdown(self) {
        if let Some(handle) = &self.autocommit {
            handle.stop();
        }
        if let Some(store) = &self.store {
            store.commit().await;
        }
    }
}

impl fmt::Debug for SelectedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedCache")
            .field("store", &self.store)
            .field("autocommit", &self.autocommit.is_some())
            .finish_non_exhaustive()
    }
}

/// Pick the cache for this process.
///
/// Creating a file store spawns its hydration task, so this must run inside a
/// tokio runtime.
///
/// # Errors
///
/// Returns `ConfigError::Invalid` if a file cache is requested with an empty path.
pub fn select_cache(config: CacheConfig) -> Result<SelectedCache, ConfigError> {
    match config {
        CacheConfig::External(cache) => {
            tracing::info!("using externally supplied cache");
            Ok(SelectedCache { cache, store: None, autocommit: None })
        }
        CacheConfig::File { path, autocommit } => {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid { field: "cache_file".into(), reason: "must not be empty".into() });
            }

            tracing::info!(path = %path.display(), "using file cache");
            let store = CacheStore::open(path);
            let autocommit = autocommit.and_then(|period| store.autocommit(period));
            let cache: Arc<dyn ImageCache> = Arc::new(store.clone());

            Ok(SelectedCache { cache, store: Some(store), autocommit })
        }
        CacheConfig::Disabled => {
            tracing::info!("caching disabled");
            Ok(SelectedCache { cache: Arc::new(NullCache), store: None, autocommit: None })
        }
    }
}
