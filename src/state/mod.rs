//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageRecord`: one extracted page with its typed content blocks
//! - `CrawlState`: visited set, frontier and page set of a run
//! - `PageSet`: page records keyed by URL in discovery order

mod crawl_state;
mod page_record;

pub use crawl_state::{CrawlState, FrontierEntry, PageSet, STATE_VERSION};
pub use page_record::{ContentBlock, PageRecord, PageStatus};
