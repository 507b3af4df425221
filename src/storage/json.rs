//! JSON checkpoint file

use crate::state::{CrawlState, STATE_VERSION};
use crate::storage::{StateStore, StorageError, StorageResult};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// File name of the checkpoint inside a project directory
pub const STATE_FILE_NAME: &str = ".harvest_state.json";

/// Checkpoint stored as a single JSON file
///
/// Saves go through a sibling temporary file that is flushed, synced and
/// renamed over the target.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
    origin: String,
}

impl JsonStateStore {
    /// Creates a store for `origin` at `path`
    pub fn new(path: impl Into<PathBuf>, origin: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            origin: origin.into(),
        }
    }

    /// Creates a store at the standard location inside `project_dir`
    pub fn in_project(project_dir: &Path, origin: impl Into<String>) -> Self {
        Self::new(project_dir.join(STATE_FILE_NAME), origin)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for JsonStateStore {
    fn save(&self, state: &CrawlState) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        {
            let file = File::create(&temp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, state)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&temp, &self.path)?;

        tracing::debug!(
            "Checkpoint saved to {} ({} visited, {} queued)",
            self.path.display(),
            state.visited.len(),
            state.frontier.len()
        );
        Ok(())
    }

    fn load(&self) -> StorageResult<Option<CrawlState>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut state: CrawlState = serde_json::from_str(&content)?;

        if state.version != STATE_VERSION {
            return Err(StorageError::UnsupportedVersion {
                expected: STATE_VERSION,
                found: state.version,
            });
        }

        if state.origin != self.origin {
            return Err(StorageError::OriginMismatch {
                expected: self.origin.clone(),
                found: state.origin,
            });
        }

        state.restore();
        Ok(Some(state))
    }

    fn clear(&self) -> StorageResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{PageRecord, PageStatus};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> JsonStateStore {
        JsonStateStore::in_project(dir.path(), "https://example.com/")
    }

    fn sample_state() -> CrawlState {
        let mut state = CrawlState::new("https://example.com/");
        state.mark_visited("https://example.com/");
        state.enqueue("https://example.com/a", 1);
        state.pages.upsert(PageRecord::new(
            "https://example.com/",
            "Home",
            PageStatus::Fetched,
        ));
        state.page_count = 1;
        state
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save(&sample_state()).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.is_visited("https://example.com/"));
        assert!(loaded.is_queued("https://example.com/a"));
        assert_eq!(loaded.page_count, 1);
        assert_eq!(loaded.pages.len(), 1);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_save_replaces_previous() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save(&sample_state()).unwrap();

        let mut state = sample_state();
        state.mark_visited("https://example.com/a");
        store.save(&state).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.visited.len(), 2);
        assert!(loaded.frontier.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(store.location(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(StorageError::Corrupt(_))));
    }

    #[test]
    fn test_origin_mismatch_is_refused() {
        let dir = TempDir::new().unwrap();
        store(&dir).save(&sample_state()).unwrap();

        let other = JsonStateStore::in_project(dir.path(), "https://other.com/");
        assert!(matches!(
            other.load(),
            Err(StorageError::OriginMismatch { .. })
        ));
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.clear().unwrap();
        store.save(&sample_state()).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
