//! Page records and content blocks
//!
//! A page record is the unit everything downstream of extraction works
//! with: the scheduler stores it, the checkpoint persists it, and the
//! exporters render it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How a page record came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Fetched from the network during a run
    Fetched,
    /// Served from the response cache
    CacheHit,
    /// Fetch failed; the record carries the error
    Failed,
}

impl PageStatus {
    /// Returns true if the record carries extracted content
    pub fn has_content(&self) -> bool {
        matches!(self, Self::Fetched | Self::CacheHit)
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fetched => "fetched",
            Self::CacheHit => "cache_hit",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One typed unit of extracted page content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Heading {
        level: u8,
        text: String,
    },
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        code: String,
    },
    Image {
        src: String,
        #[serde(default)]
        alt: String,
    },
    List {
        ordered: bool,
        items: Vec<String>,
    },
}

impl ContentBlock {
    /// Number of characters of readable text in the block
    pub fn text_len(&self) -> usize {
        match self {
            Self::Text { text } | Self::Heading { text, .. } => text.chars().count(),
            Self::Code { code, .. } => code.chars().count(),
            Self::Image { alt, .. } => alt.chars().count(),
            Self::List { items, .. } => items.iter().map(|i| i.chars().count()).sum(),
        }
    }

    /// Returns true for image blocks
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. })
    }
}

/// One discovered document unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Canonical URL, unique within a crawl
    pub url: String,

    pub title: String,

    pub content_blocks: Vec<ContentBlock>,

    /// Absolute URLs of every image the page references
    pub images: BTreeSet<String>,

    pub fetched_at: DateTime<Utc>,

    pub status: PageStatus,

    /// Link distance from the crawl root
    #[serde(default)]
    pub depth: u32,

    /// Path relative to the docs directory (repository sources)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageRecord {
    /// Creates a record for a page with extracted content
    pub fn new(url: impl Into<String>, title: impl Into<String>, status: PageStatus) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content_blocks: Vec::new(),
            images: BTreeSet::new(),
            fetched_at: Utc::now(),
            status,
            depth: 0,
            source_path: None,
            error: None,
        }
    }

    /// Creates a record for a page whose fetch failed
    pub fn failed(url: impl Into<String>, depth: u32, error: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            title: url.clone(),
            url,
            content_blocks: Vec::new(),
            images: BTreeSet::new(),
            fetched_at: Utc::now(),
            status: PageStatus::Failed,
            depth,
            source_path: None,
            error: Some(error.into()),
        }
    }

    /// Total readable text across all blocks
    pub fn text_len(&self) -> usize {
        self.content_blocks.iter().map(ContentBlock::text_len).sum()
    }

    /// Returns true if the extracted text is shorter than `min_chars`
    pub fn is_near_empty(&self, min_chars: usize) -> bool {
        self.text_len() < min_chars
    }

    /// Removes every image block and image reference
    pub fn strip_images(&mut self) {
        self.content_blocks.retain(|block| !block.is_image());
        self.images.clear();
    }
}
