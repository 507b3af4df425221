//! Scheduler for the crawl frontier and safety limits
//!
//! This module handles:
//! - Breadth-first selection of the next frontier entry
//! - Depth-bounded enqueueing of discovered links
//! - Page-count and non-documentation termination checks
//! - Recording page and failure outcomes into the crawl state
//! - Checkpoint cadence
//!
//! The scheduler holds only limits; every decision is a function of the
//! [`CrawlState`] passed in, which the coordinator owns.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::FailureKind;
use crate::crawler::outcome::{AbortReason, RunOutcome};
use crate::state::{CrawlState, FrontierEntry, PageRecord};

/// Limits applied to one run
#[derive(Debug, Clone)]
pub struct CrawlLimits {
    pub max_pages: Option<u32>,
    pub max_depth: Option<u32>,
    pub checkpoint_interval: u32,
    pub max_consecutive_non_doc: u32,
    pub max_non_doc_ratio: f64,
    pub non_doc_min_sample: u32,
    pub min_content_chars: usize,
}

impl CrawlLimits {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            max_depth: config.max_depth,
            checkpoint_interval: config.checkpoint_interval,
            max_consecutive_non_doc: config.max_consecutive_non_doc,
            max_non_doc_ratio: config.max_non_doc_ratio,
            non_doc_min_sample: config.non_doc_min_sample,
            min_content_chars: config.min_content_chars,
        }
    }
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// How a fetched page was accounted for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page carried content and is in the page set
    Content,
    /// The page was near-empty and only counted toward the non-doc guard
    NearEmpty,
}

/// What to do about a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Record a failed page and carry on
    Record,
    /// Stop the run
    Abort(AbortReason),
}

/// Decides between aborting and continuing after a failed fetch
///
/// Only a rate limit on a source that cannot make progress without its
/// request budget stops the run; everything else is a per-page failure.
pub fn failure_action(failure: &FailureKind, aborts_on_rate_limit: bool) -> FailureAction {
    match failure {
        FailureKind::RateLimited { .. } if aborts_on_rate_limit => {
            FailureAction::Abort(AbortReason::RateLimited)
        }
        _ => FailureAction::Record,
    }
}

/// Scheduler applying [`CrawlLimits`] to a crawl state
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    limits: CrawlLimits,
}

impl Scheduler {
    pub fn new(limits: CrawlLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &CrawlLimits {
        &self.limits
    }

    /// Checks whether the run is over
    ///
    /// The first matching condition wins:
    /// 1. The page budget is spent → `Completed`
    /// 2. The non-documentation guard tripped → `Aborted(NonDocumentation)`
    /// 3. The frontier is empty → `Completed`, or `Aborted(NothingFetched)`
    ///    when no page with content was found
    ///
    /// # Returns
    ///
    /// `None` while the run should continue
    pub fn check_termination(&self, state: &CrawlState) -> Option<RunOutcome> {
        if let Some(max_pages) = self.limits.max_pages {
            if state.page_count >= max_pages {
                tracing::info!("Reached page limit of {}", max_pages);
                return Some(RunOutcome::Completed);
            }
        }

        if self.non_doc_guard_tripped(state) {
            return Some(RunOutcome::Aborted(AbortReason::NonDocumentation));
        }

        if !state.frontier.iter().any(|e| !state.is_visited(&e.url)) {
            if state.pages.content_count() == 0 {
                return Some(RunOutcome::Aborted(AbortReason::NothingFetched));
            }
            return Some(RunOutcome::Completed);
        }

        None
    }

    /// Returns true if too many near-empty pages were seen
    pub fn non_doc_guard_tripped(&self, state: &CrawlState) -> bool {
        if state.consecutive_non_doc > self.limits.max_consecutive_non_doc {
            tracing::warn!(
                "{} consecutive near-empty pages (limit {})",
                state.consecutive_non_doc,
                self.limits.max_consecutive_non_doc
            );
            return true;
        }

        if state.pages_examined >= self.limits.non_doc_min_sample && state.pages_examined > 0 {
            let ratio = f64::from(state.non_doc_count) / f64::from(state.pages_examined);
            if ratio > self.limits.max_non_doc_ratio {
                tracing::warn!(
                    "{}/{} examined pages were near-empty (limit ratio {})",
                    state.non_doc_count,
                    state.pages_examined,
                    self.limits.max_non_doc_ratio
                );
                return true;
            }
        }

        false
    }

    /// Pops the next frontier entry that has not been visited
    pub fn next_entry(&self, state: &mut CrawlState) -> Option<FrontierEntry> {
        while let Some(entry) = state.pop_frontier() {
            if !state.is_visited(&entry.url) {
                return Some(entry);
            }
            tracing::trace!("Skipping already visited {}", entry.url);
        }
        None
    }

    /// Enqueues discovered links one level below `parent_depth`
    ///
    /// Links already visited or queued are ignored, as is everything when the
    /// child depth would exceed the depth limit.
    ///
    /// # Returns
    ///
    /// The number of newly queued URLs
    pub fn enqueue_links(&self, state: &mut CrawlState, links: &[String], parent_depth: u32) -> usize {
        let depth = parent_depth.saturating_add(1);
        if let Some(max_depth) = self.limits.max_depth {
            if depth > max_depth {
                return 0;
            }
        }

        links
            .iter()
            .filter(|link| state.enqueue(link, depth))
            .count()
    }

    /// Records a fetched page and updates the non-doc counters
    pub fn record_page(&self, state: &mut CrawlState, record: PageRecord) -> PageOutcome {
        state.mark_visited(&record.url);
        state.page_count += 1;
        state.pages_examined += 1;

        if record.is_near_empty(self.limits.min_content_chars) {
            state.non_doc_count += 1;
            state.consecutive_non_doc += 1;
            tracing::warn!(
                "Near-empty page {} ({} chars)",
                record.url,
                record.text_len()
            );
            return PageOutcome::NearEmpty;
        }

        state.consecutive_non_doc = 0;
        state.pages.upsert(record);
        PageOutcome::Content
    }

    /// Records a failed fetch as a `failed` page
    ///
    /// A record with content for the same URL is never replaced.
    pub fn record_failure(&self, state: &mut CrawlState, entry: &FrontierEntry, failure: &FailureKind) {
        state.mark_visited(&entry.url);
        if !state.has_content(&entry.url) {
            state
                .pages
                .upsert(PageRecord::failed(&entry.url, entry.depth, failure.to_string()));
        }
    }

    /// Returns true if a checkpoint is due after the latest examined page
    pub fn should_checkpoint(&self, state: &CrawlState) -> bool {
        let interval = self.limits.checkpoint_interval;
        interval > 0 && state.pages_examined > 0 && state.pages_examined % interval == 0
    }
}
