//! Repository source
//!
//! Walks a docs directory through the hosting service's contents API and
//! fetches every Markdown file from the raw file host. Directory listings
//! become frontier entries like any page, so they are checkpointed and
//! resumed the same way.

use crate::config::GithubConfig;
use crate::crawler::fetcher::{FailureKind, Fetcher};
use crate::crawler::markdown::{extract_markdown, normalize_markdown};
use crate::crawler::parser::ExtractOptions;
use crate::crawler::source::{invalid_entry, DocSource, RawDocument, Visit};
use crate::state::{FrontierEntry, PageStatus};
use crate::url::{normalize_url, RepoRef, RepoScope};
use crate::HarvestError;
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

/// One entry of a contents API directory listing
#[derive(Debug, Clone, Deserialize)]
struct ContentsEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    download_url: Option<String>,
}

/// A listing is an array for directories and a single object for files
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Directory(Vec<ContentsEntry>),
    File(ContentsEntry),
}

/// A docs directory inside a hosted repository
#[derive(Debug, Clone)]
pub struct RepoSource {
    repo: RepoRef,
    scope: RepoScope,
    token: Option<String>,
    options: ExtractOptions,
}

impl RepoSource {
    /// Creates a source for `repo` using the API and raw hosts from `github`
    pub fn new(
        repo: RepoRef,
        github: &GithubConfig,
        token: Option<String>,
        options: ExtractOptions,
    ) -> Result<Self, HarvestError> {
        let api_base = Url::parse(&github.api_base_url)?;
        let raw_base = Url::parse(&github.raw_base_url)?;
        let scope = RepoScope::new(&repo, &api_base, &raw_base, &github.extensions)?;

        Ok(Self {
            repo,
            scope,
            token: token.filter(|t| !t.trim().is_empty()),
            options,
        })
    }

    /// Listing URL for a repository path, normalized like every frontier URL
    fn listing_url(&self, repo_path: &str) -> Option<String> {
        let url = self.scope.contents_url(repo_path, &self.repo.branch).ok()?;
        normalize_url(url.as_str()).ok().map(|u| u.to_string())
    }

    /// Frontier URLs for the children of a listing, sorted by name
    fn children(&self, response: ContentsResponse) -> Vec<String> {
        let mut entries = match response {
            ContentsResponse::Directory(entries) => entries,
            ContentsResponse::File(entry) => vec![entry],
        };
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        entries
            .into_iter()
            .filter_map(|entry| match entry.kind.as_str() {
                "dir" => self.listing_url(&entry.path),
                "file" if self.scope.is_doc_file(&entry.path) => {
                    let url = entry.download_url?;
                    let url = normalize_url(&url).ok()?;
                    if self.scope.contains_file(&url) {
                        Some(url.to_string())
                    } else {
                        tracing::debug!("Skipping out-of-scope file {}", url);
                        None
                    }
                }
                _ => None,
            })
            .collect()
    }

    async fn visit_listing(
        &self,
        fetcher: &mut Fetcher,
        entry: &FrontierEntry,
    ) -> Result<Visit, FailureKind> {
        let fetched = fetcher.fetch(&entry.url, self.auth_token()).await?;
        let response: ContentsResponse =
            serde_json::from_str(&fetched.body).map_err(|e| FailureKind::Unreachable {
                url: entry.url.clone(),
                reason: format!("Invalid directory listing: {}", e),
                status: None,
            })?;

        let links = self.children(response);
        tracing::debug!("Listing {} has {} documentation entries", entry.url, links.len());
        Ok(Visit::Listing { links })
    }

    async fn visit_file(
        &self,
        fetcher: &mut Fetcher,
        entry: &FrontierEntry,
        url: &Url,
    ) -> Result<Visit, FailureKind> {
        let fetched = fetcher.fetch(&entry.url, self.auth_token()).await?;

        let relative_path = self
            .scope
            .relative_path(url)
            .unwrap_or_else(|| url.path().trim_start_matches('/').to_string());

        let mut record = extract_markdown(url, &fetched.body, &self.options);
        record.url = entry.url.clone();
        record.depth = entry.depth;
        record.source_path = Some(relative_path.clone());
        if fetched.from_cache {
            record.status = PageStatus::CacheHit;
        }

        Ok(Visit::Page {
            record,
            links: Vec::new(),
            raw: Some(RawDocument {
                relative_path,
                content: normalize_markdown(&fetched.body),
            }),
        })
    }
}

#[async_trait]
impl DocSource for RepoSource {
    fn seeds(&self) -> Vec<FrontierEntry> {
        self.listing_url(&self.repo.path)
            .map(|url| FrontierEntry::new(url, 0))
            .into_iter()
            .collect()
    }

    fn auth_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn aborts_on_rate_limit(&self) -> bool {
        true
    }

    async fn visit(&self, fetcher: &mut Fetcher, entry: &FrontierEntry) -> Result<Visit, FailureKind> {
        let url = Url::parse(&entry.url).map_err(|e| invalid_entry(entry, e.to_string()))?;

        if self.scope.contains_listing(&url) {
            self.visit_listing(fetcher, entry).await
        } else if self.scope.contains_file(&url) {
            self.visit_file(fetcher, entry, &url).await
        } else {
            Err(invalid_entry(entry, "outside the repository docs directory"))
        }
    }
}
