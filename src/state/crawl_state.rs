//! Crawl state owned by the coordinator for the duration of one run

use crate::state::page_record::PageRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Current checkpoint format version
pub const STATE_VERSION: u32 = 1;

/// A URL waiting to be visited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: u32,
}

impl FrontierEntry {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// Page records keyed by URL, iterated in insertion order
///
/// Replacing a record keeps its original position, so the export order is
/// always the order in which pages were first recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<PageRecord>", into = "Vec<PageRecord>")]
pub struct PageSet {
    records: Vec<PageRecord>,
    index: HashMap<String, usize>,
}

impl PageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, replacing any record with the same URL
    ///
    /// Returns the replaced record.
    pub fn upsert(&mut self, record: PageRecord) -> Option<PageRecord> {
        match self.index.get(&record.url) {
            Some(&position) => Some(std::mem::replace(&mut self.records[position], record)),
            None => {
                self.index.insert(record.url.clone(), self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    pub fn get(&self, url: &str) -> Option<&PageRecord> {
        self.index.get(url).map(|&position| &self.records[position])
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageRecord> {
        self.records.iter()
    }

    /// Number of records carrying extracted content
    pub fn content_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status.has_content())
            .count()
    }

    /// Records in insertion order
    pub fn as_slice(&self) -> &[PageRecord] {
        &self.records
    }
}

impl From<Vec<PageRecord>> for PageSet {
    fn from(records: Vec<PageRecord>) -> Self {
        let mut set = PageSet::new();
        for record in records {
            set.upsert(record);
        }
        set
    }
}

impl From<PageSet> for Vec<PageRecord> {
    fn from(set: PageSet) -> Self {
        set.records
    }
}

/// Everything a run knows: what was seen, what is pending, what was found
///
/// The coordinator is the only writer. The whole value is serialized as the
/// checkpoint, so a loaded state continues exactly where the saved one
/// stopped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlState {
    pub version: u32,

    /// Origin key of the target this state belongs to
    pub origin: String,

    pub visited: BTreeSet<String>,

    pub frontier: VecDeque<FrontierEntry>,

    /// URLs currently in the frontier, rebuilt after loading
    #[serde(skip)]
    queued: HashSet<String>,

    pub pages: PageSet,

    /// Near-empty pages seen so far
    pub non_doc_count: u32,

    /// Near-empty pages seen since the last page with content
    pub consecutive_non_doc: u32,

    /// Pages fetched successfully
    pub page_count: u32,

    /// Pages fetched and run through extraction, empty or not
    pub pages_examined: u32,
}

impl CrawlState {
    /// Creates an empty state for the given origin
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            version: STATE_VERSION,
            origin: origin.into(),
            visited: BTreeSet::new(),
            frontier: VecDeque::new(),
            queued: HashSet::new(),
            pages: PageSet::new(),
            non_doc_count: 0,
            consecutive_non_doc: 0,
            page_count: 0,
            pages_examined: 0,
        }
    }

    /// Rebuilds derived indexes after deserialization
    ///
    /// Duplicate frontier entries and entries already visited are dropped.
    pub fn restore(&mut self) {
        self.queued.clear();
        let frontier = std::mem::take(&mut self.frontier);
        for entry in frontier {
            if !self.visited.contains(&entry.url) && self.queued.insert(entry.url.clone()) {
                self.frontier.push_back(entry);
            }
        }
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn is_queued(&self, url: &str) -> bool {
        self.queued.contains(url)
    }

    /// Adds a URL to the back of the frontier
    ///
    /// Returns false if the URL was already visited or queued.
    pub fn enqueue(&mut self, url: &str, depth: u32) -> bool {
        if self.is_visited(url) || self.is_queued(url) {
            return false;
        }
        self.queued.insert(url.to_string());
        self.frontier.push_back(FrontierEntry::new(url, depth));
        true
    }

    /// Puts an entry back at the head of the frontier
    pub fn requeue_front(&mut self, entry: FrontierEntry) {
        if self.is_visited(&entry.url) || !self.queued.insert(entry.url.clone()) {
            return;
        }
        self.frontier.push_front(entry);
    }

    /// Removes and returns the oldest frontier entry
    pub fn pop_frontier(&mut self) -> Option<FrontierEntry> {
        let entry = self.frontier.pop_front()?;
        self.queued.remove(&entry.url);
        Some(entry)
    }

    pub fn mark_visited(&mut self, url: &str) {
        self.visited.insert(url.to_string());
    }

    /// Makes failed pages eligible for another attempt
    ///
    /// Their records stay in place until a successful fetch replaces them.
    /// Returns the number of URLs queued.
    pub fn requeue_failed(&mut self) -> usize {
        let failed: Vec<(String, u32)> = self
            .pages
            .iter()
            .filter(|r| !r.status.has_content())
            .map(|r| (r.url.clone(), r.depth))
            .collect();

        let mut count = 0;
        for (url, depth) in failed {
            self.visited.remove(&url);
            if self.enqueue(&url, depth) {
                count += 1;
            }
        }
        count
    }

    /// Returns true if this URL already has a record with content
    pub fn has_content(&self, url: &str) -> bool {
        self.pages
            .get(url)
            .map(|r| r.status.has_content())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PageStatus;

    #[test]
    fn test_enqueue_rejects_duplicates() {
        let mut state = CrawlState::new("https://example.com/");
        assert!(state.enqueue("https://example.com/a", 1));
        assert!(!state.enqueue("https://example.com/a", 2));

        state.mark_visited("https://example.com/b");
        assert!(!state.enqueue("https://example.com/b", 1));
        assert_eq!(state.frontier.len(), 1);
    }

    #[test]
    fn test_pop_is_fifo() {
        let mut state = CrawlState::new("o");
        state.enqueue("a", 0);
        state.enqueue("b", 1);
        state.enqueue("c", 1);
        assert_eq!(state.pop_frontier().unwrap().url, "a");
        assert_eq!(state.pop_frontier().unwrap().url, "b");
        assert!(!state.is_queued("b"));
        assert!(state.is_queued("c"));
    }

    #[test]
    fn test_requeue_front() {
        let mut state = CrawlState::new("o");
        state.enqueue("a", 0);
        state.enqueue("b", 0);
        let first = state.pop_frontier().unwrap();
        state.requeue_front(first);
        assert_eq!(state.pop_frontier().unwrap().url, "a");
    }

    #[test]
    fn test_page_set_replace_keeps_position() {
        let mut pages = PageSet::new();
        pages.upsert(PageRecord::failed("a", 0, "boom"));
        pages.upsert(PageRecord::new("b", "B", PageStatus::Fetched));
        let replaced = pages.upsert(PageRecord::new("a", "A", PageStatus::Fetched));

        assert!(replaced.is_some());
        assert_eq!(pages.len(), 2);
        let urls: Vec<&str> = pages.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "b"]);
        assert_eq!(pages.get("a").unwrap().title, "A");
        assert_eq!(pages.content_count(), 2);
    }

    #[test]
    fn test_requeue_failed() {
        let mut state = CrawlState::new("o");
        state.mark_visited("ok");
        state.mark_visited("bad");
        state
            .pages
            .upsert(PageRecord::new("ok", "Ok", PageStatus::Fetched));
        state.pages.upsert(PageRecord::failed("bad", 3, "timeout"));

        assert_eq!(state.requeue_failed(), 1);
        assert!(state.is_visited("ok"));
        assert!(!state.is_visited("bad"));
        assert_eq!(state.frontier.front().unwrap(), &FrontierEntry::new("bad", 3));
    }

    #[test]
    fn test_serde_round_trip_restores_queue_index() {
        let mut state = CrawlState::new("o");
        state.enqueue("a", 0);
        state.enqueue("b", 1);
        state.mark_visited("x");
        state
            .pages
            .upsert(PageRecord::new("x", "X", PageStatus::Fetched));

        let json = serde_json::to_string(&state).unwrap();
        let mut loaded: CrawlState = serde_json::from_str(&json).unwrap();
        loaded.restore();

        assert!(loaded.is_queued("a"));
        assert!(!loaded.enqueue("b", 2));
        assert!(loaded.has_content("x"));
        assert_eq!(loaded.pages.len(), 1);
    }
}
