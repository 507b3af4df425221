//! Run outcomes

use crate::state::CrawlState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a run stopped before its frontier was exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// Too many near-empty pages; the target is probably not documentation
    NonDocumentation,
    /// The remote reported an exhausted request budget
    RateLimited,
    /// The frontier ran dry without a single page with content
    NothingFetched,
    /// The shutdown signal fired
    Interrupted,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::NonDocumentation => {
                "the target does not look like documentation (too many near-empty pages)"
            }
            Self::RateLimited => {
                "rate limited by the remote host; rerun later with --incremental, ideally with an auth token"
            }
            Self::NothingFetched => "no page with content could be fetched",
            Self::Interrupted => "interrupted; progress saved, rerun with --incremental to resume",
        };
        f.write_str(message)
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Aborted(AbortReason),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::Aborted(_) => 2,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

/// What a finished run hands back to its caller
#[derive(Debug)]
pub struct CrawlReport {
    pub outcome: RunOutcome,
    pub state: CrawlState,
    /// Network requests issued during this run, retries included
    pub requests_issued: u64,
}
