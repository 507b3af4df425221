//! Website source

use crate::crawler::fetcher::{FailureKind, Fetcher};
use crate::crawler::parser::{extract, ExtractOptions};
use crate::crawler::source::{invalid_entry, DocSource, Visit};
use crate::state::{FrontierEntry, PageStatus};
use crate::url::SiteScope;
use async_trait::async_trait;
use url::Url;

/// A documentation website crawled by following in-scope links
#[derive(Debug, Clone)]
pub struct SiteSource {
    root: Url,
    scope: SiteScope,
    options: ExtractOptions,
}

impl SiteSource {
    pub fn new(root: Url, path_prefix: Option<&str>, options: ExtractOptions) -> Self {
        let scope = SiteScope::new(&root, path_prefix);
        Self {
            root,
            scope,
            options,
        }
    }
}

#[async_trait]
impl DocSource for SiteSource {
    fn seeds(&self) -> Vec<FrontierEntry> {
        vec![FrontierEntry::new(self.root.as_str(), 0)]
    }

    async fn visit(&self, fetcher: &mut Fetcher, entry: &FrontierEntry) -> Result<Visit, FailureKind> {
        let url = Url::parse(&entry.url).map_err(|e| invalid_entry(entry, e.to_string()))?;

        let fetched = fetcher.fetch(&entry.url, None).await?;

        // Resolve against the redirect target while it stays on the site
        let base = Url::parse(&fetched.final_url)
            .ok()
            .filter(|final_url| self.scope.contains(final_url))
            .unwrap_or(url);

        let scope = &self.scope;
        let extraction = extract(
            &base,
            &fetched.body,
            &fetched.content_type,
            &self.options,
            &|link: &Url| scope.contains(link),
        );

        let mut record = extraction.record;
        record.url = entry.url.clone();
        record.depth = entry.depth;
        if fetched.from_cache {
            record.status = PageStatus::CacheHit;
        }

        tracing::debug!(
            "Extracted {} ({} blocks, {} links)",
            entry.url,
            record.content_blocks.len(),
            extraction.links.len()
        );

        Ok(Visit::Page {
            record,
            links: extraction.links,
            raw: None,
        })
    }
}
