//! HTTP response cache
//!
//! Responses are stored under a key derived from the request identity and
//! expire after a caller-supplied TTL. Expired entries are removed lazily:
//! the lookup that finds one deletes it and reports a miss. There is no
//! background sweep.

mod schema;
mod sqlite;

pub use sqlite::SqliteCache;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// A stored response
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub body: String,
    pub headers: Vec<(String, String)>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Looks up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Trait for response cache backends
pub trait ResponseCache: Send {
    /// Returns the entry for `key`, or None if absent or expired
    ///
    /// An expired entry is deleted as a side effect.
    fn get(&mut self, key: &str) -> CacheResult<Option<CacheEntry>>;

    /// Stores a response for `ttl`
    ///
    /// A zero TTL stores nothing and drops any existing entry for the key.
    fn put(
        &mut self,
        key: &str,
        body: &str,
        headers: &[(String, String)],
        ttl: Duration,
    ) -> CacheResult<()>;

    /// Deletes every expired entry, returning how many were removed
    fn purge_expired(&mut self) -> CacheResult<usize>;
}

/// Derives the cache key for a GET of `url`
///
/// The key is the hex SHA-256 of the normalized request identity, so it is
/// safe to use as a primary key whatever the URL contains.
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"GET ");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
