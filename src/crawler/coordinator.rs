//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Creating a fresh state or resuming a saved checkpoint
//! - Pulling entries from the frontier through the scheduler
//! - Visiting entries through a [`DocSource`]
//! - Periodic and final checkpoints
//! - Handling interrupts

use crate::crawler::fetcher::Fetcher;
use crate::crawler::outcome::{AbortReason, CrawlReport, RunOutcome};
use crate::crawler::scheduler::{failure_action, FailureAction, PageOutcome, Scheduler};
use crate::crawler::source::{DocSource, RawDocument, Visit};
use crate::state::CrawlState;
use crate::storage::{persistence_error, StateStore};
use crate::HarvestError;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

/// Main crawler coordinator structure
///
/// The coordinator is the only owner of the crawl state, the fetcher (and
/// through it the response cache) and the checkpoint store, so the loop
/// runs without locks.
pub struct Coordinator<S: DocSource> {
    source: S,
    fetcher: Fetcher,
    scheduler: Scheduler,
    store: Box<dyn StateStore>,
    state: CrawlState,
    incremental: bool,
    raw_dir: Option<PathBuf>,
}

impl<S: DocSource> Coordinator<S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `source` - The documentation source to crawl
    /// * `fetcher` - The cache-aware fetcher
    /// * `scheduler` - The scheduler carrying the run limits
    /// * `store` - The checkpoint store for this origin
    /// * `origin` - The origin key recorded in a fresh state
    /// * `incremental` - Resume from the checkpoint when one exists
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - The checkpoint exists but cannot be used
    pub fn new(
        source: S,
        fetcher: Fetcher,
        scheduler: Scheduler,
        store: Box<dyn StateStore>,
        origin: String,
        incremental: bool,
    ) -> Result<Self, HarvestError> {
        let saved = if incremental {
            store
                .load()
                .map_err(|e| persistence_error(store.as_ref(), e))?
        } else {
            None
        };

        let state = match saved {
            Some(mut state) => {
                let resumed_frontier = !state.frontier.is_empty();
                let retried = state.requeue_failed();
                if !resumed_frontier {
                    for seed in source.seeds() {
                        state.enqueue(&seed.url, seed.depth);
                    }
                }
                tracing::info!(
                    "Resuming from checkpoint: {} visited, {} pages, {} queued ({} failed pages retried)",
                    state.visited.len(),
                    state.pages.content_count(),
                    state.frontier.len(),
                    retried
                );
                state
            }
            None => {
                let mut state = CrawlState::new(origin);
                for seed in source.seeds() {
                    state.enqueue(&seed.url, seed.depth);
                }
                tracing::info!("Starting new crawl of {}", state.origin);
                state
            }
        };

        Ok(Self {
            source,
            fetcher,
            scheduler,
            store,
            state,
            incremental,
            raw_dir: None,
        })
    }

    /// Writes raw documents produced by the source under `dir`
    pub fn with_raw_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw_dir = Some(dir.into());
        self
    }

    /// Runs the crawl until it completes, aborts or `shutdown` resolves
    ///
    /// The loop:
    /// 1. Checks termination through the scheduler
    /// 2. Pops the next unvisited entry
    /// 3. Visits it, racing the fetch against `shutdown`
    /// 4. Records the page or failure and enqueues discovered links
    /// 5. Saves a checkpoint at the configured interval
    ///
    /// The state is saved whatever the outcome. After a completed run that
    /// was not incremental the checkpoint is removed.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<CrawlReport, HarvestError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let start_time = Instant::now();
        let mut pages_this_run: u32 = 0;

        let outcome = loop {
            if let Some(outcome) = self.scheduler.check_termination(&self.state) {
                break outcome;
            }

            let Some(entry) = self.scheduler.next_entry(&mut self.state) else {
                continue;
            };

            if self.state.has_content(&entry.url) {
                tracing::trace!("Already harvested {}", entry.url);
                self.state.mark_visited(&entry.url);
                continue;
            }

            tracing::debug!("Processing URL: {} (depth {})", entry.url, entry.depth);

            let visit = tokio::select! {
                biased;
                _ = &mut shutdown => None,
                result = self.source.visit(&mut self.fetcher, &entry) => Some(result),
            };

            let Some(visit) = visit else {
                tracing::warn!("Shutdown requested, stopping before {}", entry.url);
                self.state.requeue_front(entry);
                break RunOutcome::Aborted(AbortReason::Interrupted);
            };

            match visit {
                Ok(Visit::Listing { links }) => {
                    self.state.mark_visited(&entry.url);
                    let queued = self.scheduler.enqueue_links(&mut self.state, &links, entry.depth);
                    tracing::debug!("Queued {} entries from listing {}", queued, entry.url);
                }
                Ok(Visit::Page { record, links, raw }) => {
                    if let Some(raw) = raw {
                        self.write_raw(&raw);
                    }

                    self.state.mark_visited(&entry.url);
                    if self.scheduler.record_page(&mut self.state, record) == PageOutcome::Content {
                        tracing::debug!("Harvested {}", entry.url);
                    }
                    self.scheduler.enqueue_links(&mut self.state, &links, entry.depth);
                    pages_this_run += 1;

                    if pages_this_run % 10 == 0 {
                        let elapsed = start_time.elapsed();
                        let rate = pages_this_run as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
                        tracing::info!(
                            "Progress: {} pages fetched, {} in frontier, {:.2} pages/sec",
                            self.state.page_count,
                            self.state.frontier.len(),
                            rate
                        );
                    }

                    if self.scheduler.should_checkpoint(&self.state) {
                        self.save()?;
                    }
                }
                Err(failure) => {
                    match failure_action(&failure, self.source.aborts_on_rate_limit()) {
                        FailureAction::Abort(reason) => {
                            tracing::error!("{}", failure);
                            self.state.requeue_front(entry);
                            break RunOutcome::Aborted(reason);
                        }
                        FailureAction::Record => {
                            tracing::warn!("Failed to fetch {}: {}", entry.url, failure);
                            self.scheduler.record_failure(&mut self.state, &entry, &failure);
                        }
                    }
                }
            }
        };

        self.save()?;
        if outcome.is_completed() && !self.incremental {
            self.store
                .clear()
                .map_err(|e| persistence_error(self.store.as_ref(), e))?;
        }

        match outcome {
            RunOutcome::Completed => tracing::info!(
                "Crawl completed: {} pages harvested, {} requests in {:?}",
                self.state.pages.content_count(),
                self.fetcher.requests_issued(),
                start_time.elapsed()
            ),
            RunOutcome::Aborted(reason) => tracing::warn!("Crawl aborted: {}", reason),
        }

        Ok(CrawlReport {
            outcome,
            requests_issued: self.fetcher.requests_issued(),
            state: self.state,
        })
    }

    fn save(&self) -> Result<(), HarvestError> {
        self.store
            .save(&self.state)
            .map_err(|e| persistence_error(self.store.as_ref(), e))
    }

    fn write_raw(&self, raw: &RawDocument) {
        let Some(dir) = &self.raw_dir else {
            return;
        };
        match write_raw_document(dir, raw) {
            Ok(path) => tracing::debug!("Wrote {}", path.display()),
            Err(e) => tracing::warn!("Failed to write {}: {}", raw.relative_path, e),
        }
    }
}

/// Writes a raw document below `dir`, refusing paths that would escape it
pub fn write_raw_document(dir: &Path, raw: &RawDocument) -> std::io::Result<PathBuf> {
    let relative: PathBuf = Path::new(&raw.relative_path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();

    if relative.as_os_str().is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("empty document path '{}'", raw.relative_path),
        ));
    }

    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, &raw.content)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_raw_document_nested() {
        let dir = tempfile::tempdir().unwrap();
        let raw = RawDocument {
            relative_path: "guide/intro.md".to_string(),
            content: "# Intro\n".to_string(),
        };
        let path = write_raw_document(dir.path(), &raw).unwrap();
        assert_eq!(path, dir.path().join("guide").join("intro.md"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# Intro\n");
    }

    #[test]
    fn test_write_raw_document_stays_inside_dir() {
        let dir = tempfile::tempdir().unwrap();
        let raw = RawDocument {
            relative_path: "../../etc/passwd.md".to_string(),
            content: "x".to_string(),
        };
        let path = write_raw_document(dir.path(), &raw).unwrap();
        assert!(path.starts_with(dir.path()));

        let empty = RawDocument {
            relative_path: "..".to_string(),
            content: "x".to_string(),
        };
        assert!(write_raw_document(dir.path(), &empty).is_err());
    }
}
