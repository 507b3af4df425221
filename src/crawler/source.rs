//! Documentation sources
//!
//! A source knows where a crawl starts, how one frontier entry is fetched
//! and what it yields. The coordinator drives any source the same way.

use crate::crawler::fetcher::{FailureKind, Fetcher};
use crate::state::{FrontierEntry, PageRecord};
use async_trait::async_trait;

/// A fetched source file to be written out verbatim (after normalization)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Path relative to the docs root
    pub relative_path: String,
    pub content: String,
}

/// What visiting one frontier entry produced
#[derive(Debug, Clone)]
pub enum Visit {
    /// A document page
    Page {
        record: PageRecord,
        links: Vec<String>,
        raw: Option<RawDocument>,
    },
    /// A directory listing; only its children matter
    Listing { links: Vec<String> },
}

/// A crawlable documentation source
#[async_trait]
pub trait DocSource: Send + Sync {
    /// Entries the frontier starts with on a fresh run
    fn seeds(&self) -> Vec<FrontierEntry>;

    /// Token sent with every request, if any
    fn auth_token(&self) -> Option<&str> {
        None
    }

    /// Returns true if a rate limit should stop the whole run
    fn aborts_on_rate_limit(&self) -> bool {
        false
    }

    /// Fetches and extracts one frontier entry
    ///
    /// The returned page record is keyed by `entry.url` and carries
    /// `entry.depth`.
    async fn visit(&self, fetcher: &mut Fetcher, entry: &FrontierEntry) -> Result<Visit, FailureKind>;
}

/// Builds the failure for a frontier URL that cannot be parsed or is out of scope
pub(crate) fn invalid_entry(entry: &FrontierEntry, reason: impl Into<String>) -> FailureKind {
    FailureKind::Unreachable {
        url: entry.url.clone(),
        reason: reason.into(),
        status: None,
    }
}
