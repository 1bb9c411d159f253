//! TTL-cached, retrying access to raw extracts.
//!
//! Wraps a [`DataSource`] with a per-key time-to-live cache of the fetched
//! bytes and transparent retry logic. Only raw blobs are cached; every view
//! re-parses and re-aggregates from them on each request.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use dash_core::error::{DashError, Result};

use crate::source::DataSource;

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Default cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Maximum number of fetch attempts for transient failures.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Back-off unit; attempt `n` sleeps `n * RETRY_STEP`.
const RETRY_STEP: Duration = Duration::from_millis(100);

struct CachedBlob {
    bytes: Arc<Vec<u8>>,
    fetched_at: Instant,
    /// Set while this copy is being served because a refetch failed.
    stale_error: Option<String>,
}

// ── DataManager ───────────────────────────────────────────────────────────────

/// TTL-cached wrapper around a [`DataSource`].
///
/// # Example
/// ```no_run
/// use dash_runtime::data_manager::DataManager;
/// use dash_runtime::source::DirectorySource;
///
/// let mut mgr = DataManager::new(Box::new(DirectorySource::new("data")), 300);
/// let bytes = mgr.get("financial.csv", false).unwrap();
/// println!("{} bytes", bytes.len());
/// ```
pub struct DataManager {
    source: Box<dyn DataSource>,
    /// Maximum age of a cached blob before it is refetched.
    cache_ttl: Duration,
    retry_step: Duration,
    cache: HashMap<String, CachedBlob>,
}

impl DataManager {
    pub fn new(source: Box<dyn DataSource>, cache_ttl_secs: u64) -> Self {
        Self {
            source,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            retry_step: RETRY_STEP,
            cache: HashMap::new(),
        }
    }

    /// Override the back-off unit.
    pub fn with_retry_step(mut self, step: Duration) -> Self {
        self.retry_step = step;
        self
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Bytes of extract `key`, from the cache while it is still valid.
    ///
    /// When `force_refresh` is `true` the cache is bypassed. If every
    /// attempt fails but a stale copy exists, the stale copy is returned.
    pub fn get(&mut self, key: &str, force_refresh: bool) -> Result<Arc<Vec<u8>>> {
        if !force_refresh {
            if let Some(bytes) = self.cached(key) {
                tracing::debug!(key, "returning cached extract");
                return Ok(bytes);
            }
        }

        match self.fetch_with_retry(key) {
            Ok(bytes) => {
                let bytes = Arc::new(bytes);
                tracing::debug!(key, size = bytes.len(), "extract cache updated");
                self.cache.insert(
                    key.to_string(),
                    CachedBlob {
                        bytes: Arc::clone(&bytes),
                        fetched_at: Instant::now(),
                        stale_error: None,
                    },
                );
                Ok(bytes)
            }
            Err(e) => match self.cache.get_mut(key) {
                Some(stale) if e.is_transient() => {
                    tracing::warn!(key, error = %e, "fetch failed; using stale extract");
                    stale.stale_error = Some(e.to_string());
                    Ok(Arc::clone(&stale.bytes))
                }
                _ => Err(e),
            },
        }
    }

    /// Discard every cached extract.
    pub fn invalidate_cache(&mut self) {
        self.cache.clear();
        tracing::debug!("cache invalidated");
    }

    /// Age of the cached copy of `key`, or `None` if it was never fetched.
    pub fn cache_age(&self, key: &str) -> Option<Duration> {
        self.cache.get(key).map(|c| c.fetched_at.elapsed())
    }

    /// Error of the failed refetch while a stale copy of `key` is served.
    pub fn stale_error(&self, key: &str) -> Option<&str> {
        self.cache.get(key).and_then(|c| c.stale_error.as_deref())
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn cached(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        self.cache
            .get(key)
            .filter(|c| c.fetched_at.elapsed() < self.cache_ttl)
            .map(|c| Arc::clone(&c.bytes))
    }

    /// Up to [`MAX_RETRY_ATTEMPTS`] fetches with linear back-off.
    ///
    /// Only [`DashError::TransientIo`] is retried.
    fn fetch_with_retry(&self, key: &str) -> Result<Vec<u8>> {
        let mut last_err = DashError::TransientIo(format!("no attempt made for {}", key));

        for attempt in 0..MAX_RETRY_ATTEMPTS {
            if attempt > 0 {
                let sleep = self.retry_step * attempt;
                tracing::debug!(key, attempt, sleep_ms = sleep.as_millis() as u64, "retrying fetch after back-off");
                thread::sleep(sleep);
            }

            match self.source.fetch(key) {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_transient() => {
                    tracing::warn!(key, attempt, error = %e, "fetch attempt failed");
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
