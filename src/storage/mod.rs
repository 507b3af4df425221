//! Storage module for persisting crawl progress
//!
//! This module handles the incremental checkpoint, including:
//! - Atomic saves of the complete crawl state
//! - Loading and validating a saved state for resumption
//! - Removing the checkpoint after a completed run

mod json;
mod traits;

pub use json::{JsonStateStore, STATE_FILE_NAME};
pub use traits::{StateStore, StorageError, StorageResult};

use crate::HarvestError;

/// Wraps a storage failure with the checkpoint location
pub fn persistence_error(store: &dyn StateStore, source: StorageError) -> HarvestError {
    HarvestError::Persistence {
        path: store.location().to_path_buf(),
        source,
    }
}
