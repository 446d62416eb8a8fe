//! JSON-file backed cache store.
//!
//! The store keeps every entry in memory and writes the whole mapping back to
//! its file on `commit`. Loading the file happens on a background task right
//! after construction, so the store is usable immediately and hydration
//! merges underneath whatever was `put` in the meantime.

use super::{CachedImage, ImageCache};
use crate::Error;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, Notify, watch};
use tokio::time::{Instant, MissedTickBehavior};

/// Default period between automatic commits (60s).
pub const DEFAULT_AUTOCOMMIT: Duration = Duration::from_millis(60_000);

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, CachedImage>,
    dirty: bool,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    state: Mutex<State>,
    /// Held across snapshot and write so flushes never overlap.
    flush_lock: AsyncMutex<()>,
    hydrated: watch::Receiver<bool>,
    /// Id of the active autocommit timer, if any.
    timer: Mutex<Option<u64>>,
    next_timer_id: AtomicU64,
}

/// Write-back cache persisted as a single JSON file.
///
/// Cloning is cheap and every clone shares the same mapping.
#[derive(Clone, Debug)]
pub struct CacheStore {
    inner: Arc<Inner>,
}

impl CacheStore {
    /// Create a store bound to `path` and start hydrating it from disk.
    ///
    /// Must be called from within a tokio runtime. A missing, unreadable or
    /// malformed file leaves the store empty; the latter two are logged.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let (done_tx, done_rx) = watch::channel(false);
        let store = Self {
            inner: Arc::new(Inner {
                path: path.into(),
                state: Mutex::new(State::default()),
                flush_lock: AsyncMutex::new(()),
                hydrated: done_rx,
                timer: Mutex::new(None),
                next_timer_id: AtomicU64::new(0),
            }),
        };

        let weak = Arc::downgrade(&store.inner);
        let path = store.inner.path.clone();
        tokio::spawn(async move {
            let loaded = load(&path).await;
            if let Some(inner) = weak.upgrade() {
                match loaded {
                    Ok(Some(entries)) => {
                        let total = entries.len();
                        let added = CacheStore { inner }.merge(entries);
                        tracing::info!(path = %path.display(), total, added, "cache hydrated");
                    }
                    Ok(None) => tracing::debug!("no cache file at {}, starting empty", path.display()),
                    Err(e) => tracing::error!(error = %e, "cache hydration failed, starting empty"),
                }
            }
            done_tx.send_replace(true);
        });

        store
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Wait until the construction-time hydration has finished, whatever its outcome.
    pub async fn hydrated(&self) {
        let mut done = self.inner.hydrated.clone();
        // The sender only goes away after signalling or if the task was torn down.
        let _ = done.wait_for(|done| *done).await;
    }

    pub fn len(&self) -> usize {
        self.lock_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether there are mutations not yet written to disk.
    pub fn is_dirty(&self) -> bool {
        self.lock_state().dirty
    }

    /// Flush the whole mapping to disk if anything changed since the last flush.
    ///
    /// A commit issued while hydration is still running waits for it to
    /// finish, so entries already on disk are never overwritten. Failures are logged and swallowed. The dirty flag is cleared before
    /// writing, so a failed flush is not retried until the next `put`.
    pub async fn commit(&self) {
        match self.flush().await {
            Ok(true) => tracing::debug!(path = %self.inner.path.display(), "cache committed"),
            Ok(false) => {}
            Err(e) => tracing::error!(error = %e, "cache commit failed"),
        }
    }

    /// Start committing every `period`.
    ///
    /// Returns `None` when a timer is already running for this store or the
    /// period is zero. The timer only holds a weak reference to the store and
    /// ends once every clone has been dropped.
    pub fn autocommit(&self, period: Duration) -> Option<AutocommitHandle> {
        if period.is_zero() {
            tracing::warn!("ignoring autocommit with a zero period");
            return None;
        }

        let mut slot = lock(&self.inner.timer);
        if slot.is_some() {
            tracing::debug!("autocommit already active");
            return None;
        }

        let id = self.inner.next_timer_id.fetch_add(1, Ordering::Relaxed);
        let stop = Arc::new(Notify::new());
        let signal = Arc::clone(&stop);
        let weak = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = signal.notified() => break,
                    _ = ticker.tick() => {}
                }
                let Some(inner) = weak.upgrade() else { break };
                CacheStore { inner }.commit().await;
            }
            tracing::debug!(timer = id, "autocommit stopped");
        });

        *slot = Some(id);
        tracing::info!(path = %self.inner.path.display(), period_ms = period.as_millis() as u64, "autocommit started");

        Some(AutocommitHandle { store: Arc::downgrade(&self.inner), id, stop })
    }

    /// Whether an autocommit timer is currently active.
    pub fn is_autocommitting(&self) -> bool {
        lock(&self.inner.timer).is_some()
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        lock(&self.inner.state)
    }

    /// Add hydrated entries without touching keys that are already present.
    fn merge(&self, loaded: HashMap<String, CachedImage>) -> usize {
        let mut state = self.lock_state();
        let mut added = 0;
        for (key, value) in loaded {
            if !value.is_truthy() {
                continue;
            }
            if let Entry::Vacant(slot) = state.entries.entry(key) {
                slot.insert(value);
                added += 1;
            }
        }
        added
    }

    /// Returns whether a write was attempted.
    ///
    /// Waits for hydration first: the file is rewritten wholesale, so a
    /// snapshot taken before the disk entries are merged would drop them.
    async fn flush(&self) -> Result<bool, Error> {
        self.hydrated().await;
        let _guard = self.inner.flush_lock.lock().await;

        let snapshot = {
            let mut state = self.lock_state();
            if !state.dirty {
                return Ok(false);
            }
            state.dirty = false;
            serde_json::to_vec(&state.entries)
        }?;

        write_replace(&self.inner.path, &snapshot).await?;
        Ok(true)
    }
}

impl ImageCache for CacheStore {
    fn get(&self, key: &str) -> Option<CachedImage> {
        self.lock_state().entries.get(key).cloned()
    }

    fn put(&self, key: &str, value: Option<CachedImage>) {
        let Some(value) = value.filter(CachedImage::is_truthy) else {
            return;
        };
        let mut state = self.lock_state();
        state.entries.insert(key.to_string(), value);
        state.dirty = true;
    }
}

/// Handle to a running autocommit timer.
///
/// Dropping the handle leaves the timer running.
#[derive(Debug)]
pub struct AutocommitHandle {
    store: Weak<Inner>,
    id: u64,
    stop: Arc<Notify>,
}

impl AutocommitHandle {
    /// Cancel the timer. Safe to call more than once.
    ///
    /// A commit already in progress is allowed to finish.
    pub fn stop(&self) {
        self.stop.notify_one();
        if let Some(inner) = self.store.upgrade() {
            let mut slot = lock(&inner.timer);
            if *slot == Some(self.id) {
                *slot = None;
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn load(path: &Path) -> Result<Option<HashMap<String, CachedImage>>, Error> {
    if !tokio::fs::try_exists(path).await.map_err(|e| Error::hydrate(path, e))? {
        return Ok(None);
    }

    let data = tokio::fs::read_to_string(path).await.map_err(|e| Error::hydrate(path, e))?;
    let entries: Option<HashMap<String, CachedImage>> =
        serde_json::from_str(&data).map_err(|e| Error::malformed(path, e))?;

    Ok(Some(entries.unwrap_or_default()))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write `bytes` next to `path` and rename over it.
async fn write_replace(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let tmp = tmp_path(path);

    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(Error::flush(&tmp, e));
    }

    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(Error::flush(path, e));
    }

    Ok(())
}
