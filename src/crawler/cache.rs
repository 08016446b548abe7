//! On-disk memoization of fetched pages
//!
//! Each successful response is stored as a JSON file keyed by the SHA-256 of
//! its normalized URL. A later crawl of the same URL reads the file instead
//! of contacting the site. Entries never expire; `psych clear` removes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Cache-specific errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type alias for cache operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// A memoized HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// URL the response was fetched for
    pub url: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Directory-backed response cache
#[derive(Debug, Clone)]
pub struct FetchCache {
    dir: PathBuf,
}

impl FetchCache {
    /// Opens (creating if needed) a cache rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        Ok(Self { dir })
    }

    /// Hex SHA-256 of the URL
    pub fn key(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    /// Location of the entry for `url`: `<dir>/<first two hex chars>/<hash>.json`
    pub fn entry_path(&self, url: &str) -> PathBuf {
        let key = Self::key(url);
        self.dir.join(&key[..2]).join(format!("{}.json", key))
    }

    /// Looks up a memoized response
    ///
    /// Missing, unreadable and corrupt entries are all misses.
    pub fn get(&self, url: &str) -> Option<CachedResponse> {
        let path = self.entry_path(url);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::debug!("Unreadable cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<CachedResponse>(&bytes) {
            Ok(entry) if entry.url == url => Some(entry),
            Ok(entry) => {
                tracing::debug!(
                    "Cache entry {} belongs to {}, not {}",
                    path.display(),
                    entry.url,
                    url
                );
                None
            }
            Err(e) => {
                tracing::debug!("Corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Stores a response if it was successful
    ///
    /// The entry is written to a temporary file and renamed into place so a
    /// reader never sees a partial entry.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The entry was written
    /// * `Ok(false)` - The response was not a 2xx and was skipped
    pub fn put(&self, response: &CachedResponse) -> CacheResult<bool> {
        if !response.is_success() {
            return Ok(false);
        }

        let path = self.entry_path(&response.url);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let encoded = serde_json::to_vec(response)?;
        let tmp = path.with_extension(format!("json.tmp.{}", std::process::id()));
        fs::write(&tmp, encoded).map_err(io_err(&tmp))?;
        fs::rename(&tmp, &path).map_err(io_err(&path))?;

        Ok(true)
    }

    /// Deletes every cached entry
    pub fn clear(&self) -> CacheResult<()> {
        clear_dir(&self.dir)
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> CacheError {
    let path = path.to_path_buf();
    move |source| CacheError::Io { path, source }
}

/// Removes a cache directory; a missing directory is not an error
pub fn clear_dir(dir: &Path) -> CacheResult<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(dir)(e)),
    }
}
