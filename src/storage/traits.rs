//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::state::CrawlState;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt checkpoint: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Checkpoint belongs to {found}, not {expected}")]
    OriginMismatch { expected: String, found: String },

    #[error("Unsupported checkpoint version {found} (expected {expected})")]
    UnsupportedVersion { expected: u32, found: u32 },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for checkpoint backends
///
/// A store is scoped to one crawl origin. Saving replaces the previous
/// checkpoint atomically, so a crash never leaves a partial one behind.
pub trait StateStore: Send {
    /// Persists the complete state, replacing any earlier checkpoint
    fn save(&self, state: &CrawlState) -> StorageResult<()>;

    /// Loads the saved state
    ///
    /// # Returns
    ///
    /// * `Ok(Some(state))` - A checkpoint exists, with derived indexes rebuilt
    /// * `Ok(None)` - No checkpoint exists
    /// * `Err(StorageError)` - The checkpoint is unreadable, corrupt or for
    ///   another origin
    fn load(&self) -> StorageResult<Option<CrawlState>>;

    /// Deletes the checkpoint if present
    fn clear(&self) -> StorageResult<()>;

    /// Where the checkpoint lives, for error reporting
    fn location(&self) -> &Path;
}
