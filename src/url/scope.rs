//! Origin scope checks
//!
//! A crawl never leaves its origin. For websites the origin is the root's
//! host (plus an optional path prefix); for repositories it is the
//! repository, branch and docs directory on both the contents API and the
//! raw file host.

use crate::url::target::RepoRef;
use url::Url;

/// Path fragments that never lead to documentation pages
const SKIP_PATTERNS: &[&str] = &["/api/", "/images/", "/assets/", "/static/", "/_next/"];

/// Extensions of downloads and binary assets
const SKIP_EXTENSIONS: &[&str] = &[
    ".pdf", ".zip", ".tar.gz", ".tgz", ".gz", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico",
    ".webp", ".css", ".js", ".woff", ".woff2", ".ttf", ".mp4", ".mp3",
];

/// Repository sections on github.com that are not documentation
const GITHUB_SKIP_PATTERNS: &[&str] = &[
    "/issues/", "/pull/", "/releases/", "/actions/", "/security/", "/pulse/", "/graphs/",
    "/wiki/", "/projects/", "/settings/",
];

/// Scope of a website crawl
#[derive(Debug, Clone)]
pub struct SiteScope {
    host: String,
    port: Option<u16>,
    path_prefix: Option<String>,
}

impl SiteScope {
    /// Builds the scope for a crawl rooted at `root`
    pub fn new(root: &Url, path_prefix: Option<&str>) -> Self {
        Self {
            host: root.host_str().unwrap_or_default().to_lowercase(),
            port: root.port_or_known_default(),
            path_prefix: path_prefix.map(|p| p.trim_end_matches('/').to_string()),
        }
    }

    /// Returns true if `url` may be crawled as a documentation page
    pub fn contains(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        if url.host_str().map(str::to_lowercase).as_deref() != Some(self.host.as_str())
            || url.port_or_known_default() != self.port
        {
            return false;
        }

        let path = url.path();
        let lower = path.to_lowercase();

        if SKIP_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            return false;
        }

        // Match "/assets" as well as "/assets/logo.png"
        let with_slash = format!("{}/", lower);
        if SKIP_PATTERNS.iter().any(|p| with_slash.contains(p)) {
            return false;
        }

        if self.host == "github.com" && GITHUB_SKIP_PATTERNS.iter().any(|p| with_slash.contains(p))
        {
            return false;
        }

        match &self.path_prefix {
            Some(prefix) => path_within(path, prefix),
            None => true,
        }
    }
}

/// Scope of a repository crawl
#[derive(Debug, Clone)]
pub struct RepoScope {
    contents_root: Url,
    listing_root: Url,
    raw_root: Url,
    extensions: Vec<String>,
}

impl RepoScope {
    /// Builds the scope for `repo` served from the given API and raw hosts
    pub fn new(
        repo: &RepoRef,
        api_base: &Url,
        raw_base: &Url,
        extensions: &[String],
    ) -> Result<Self, url::ParseError> {
        let contents_root = join_segments(api_base, &["repos", &repo.owner, &repo.name, "contents"])?;
        let listing_root = join_segments(&contents_root, &[&repo.path])?;
        let raw_root = join_segments(raw_base, &[&repo.owner, &repo.name, &repo.branch, &repo.path])?;

        Ok(Self {
            contents_root,
            listing_root,
            raw_root,
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        })
    }

    /// URL of the docs directory listing (without the branch query)
    pub fn listing_root(&self) -> &Url {
        &self.listing_root
    }

    /// Contents-API listing URL of a repository path on `branch`
    pub fn contents_url(&self, repo_path: &str, branch: &str) -> Result<Url, url::ParseError> {
        let mut url = join_segments(&self.contents_root, &[repo_path])?;
        url.query_pairs_mut().clear().append_pair("ref", branch);
        Ok(url)
    }

    /// Returns true if `url` is a contents-API listing inside the docs directory
    pub fn contains_listing(&self, url: &Url) -> bool {
        same_origin(url, &self.listing_root) && path_within(url.path(), self.listing_root.path())
    }

    /// Returns true if `url` is a raw documentation file inside the docs directory
    pub fn contains_file(&self, url: &Url) -> bool {
        same_origin(url, &self.raw_root)
            && path_within(url.path(), self.raw_root.path())
            && self.is_doc_file(url.path())
    }

    /// Returns true if `path` has one of the documentation extensions
    pub fn is_doc_file(&self, path: &str) -> bool {
        let lower = path.to_lowercase();
        lower
            .rsplit_once('.')
            .map(|(_, ext)| self.extensions.iter().any(|e| e == ext))
            .unwrap_or(false)
    }

    /// Path of a raw file relative to the docs directory
    pub fn relative_path(&self, url: &Url) -> Option<String> {
        let root = self.raw_root.path().trim_end_matches('/');
        let rest = url.path().strip_prefix(root)?;
        let rest = rest.trim_start_matches('/');
        if rest.is_empty() {
            // The docs path named a single file
            url.path_segments()?.last().map(str::to_string)
        } else {
            Some(rest.to_string())
        }
    }
}

/// Appends path segments to a base URL, skipping empty and slash-separated parts
fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, url::ParseError> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
        path.pop_if_empty();
        for segment in segments {
            for part in segment.split('/').filter(|p| !p.is_empty()) {
                path.push(part);
            }
        }
    }
    Ok(url)
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Returns true if `path` equals `prefix` or lies below it on a segment boundary
fn path_within(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
