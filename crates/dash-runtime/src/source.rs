//! Where raw extracts come from.
//!
//! A [`DataSource`] hands back the bytes of one named extract. The runtime
//! never interprets them; parsing is the loader's job.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use dash_core::error::{DashError, Result};
use tracing::debug;

/// Seconds before an HTTP fetch is abandoned.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Blocking retrieval of an extract by key (its object name).
pub trait DataSource {
    /// Fails with [`DashError::NotFound`] when the key does not exist and
    /// [`DashError::TransientIo`] for failures worth retrying.
    fn fetch(&self, key: &str) -> Result<Vec<u8>>;

    /// Short description for logs and the UI footer.
    fn describe(&self) -> String;
}

// ── DirectorySource ───────────────────────────────────────────────────────────

/// Extracts stored as files in one local directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DataSource for DirectorySource {
    fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.root.join(key);
        debug!(path = %path.display(), "reading extract");
        std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DashError::NotFound(key.to_string()),
            _ => DashError::TransientIo(format!("{}: {}", path.display(), e)),
        })
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

// ── HttpSource ────────────────────────────────────────────────────────────────

/// Extracts served as objects under a base URL, e.g. a public bucket.
pub struct HttpSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashError::Config(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

impl DataSource for HttpSource {
    fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let url = self.url_for(key);
        debug!(%url, "requesting extract");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DashError::TransientIo(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::FORBIDDEN {
            // Object stores answer 403 for missing keys without list access.
            return Err(DashError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            return Err(DashError::TransientIo(format!("{} returned {}", url, status)));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| DashError::TransientIo(format!("HTTP body read failed: {}", e)))
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

// ── MemorySource ──────────────────────────────────────────────────────────────

/// In-memory extracts keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, body: impl Into<Vec<u8>>) -> Self {
        self.insert(key, body);
        self
    }

    pub fn insert(&mut self, key: &str, body: impl Into<Vec<u8>>) {
        self.blobs.insert(key.to_string(), body.into());
    }
}

impl DataSource for MemorySource {
    fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .get(key)
            .cloned()
            .ok_or_else(|| DashError::NotFound(key.to_string()))
    }

    fn describe(&self) -> String {
        format!("memory ({} extracts)", self.blobs.len())
    }
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        (**self).fetch(key)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
