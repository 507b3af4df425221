//! Crawl target parsing
//!
//! The single positional argument names either a website root or a
//! repository. Accepted repository forms:
//!
//! - `owner/name[/branch[/path]]`
//! - `https://github.com/owner/name[/tree/branch[/path]]`
//! - `https://github.com/owner/name/path` (path on the default branch)

use crate::config::GithubConfig;
use crate::url::normalize_url;
use crate::HarvestError;
use url::Url;

/// What a run crawls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A documentation website rooted at this URL
    Site(Url),
    /// A docs directory inside a hosted repository
    Repo(RepoRef),
}

/// A repository, branch and docs directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    pub branch: String,
    /// Docs directory relative to the repository root, without slashes at either end
    pub path: String,
}

impl RepoRef {
    /// Short label used in logs and document titles
    pub fn label(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl Target {
    /// Stable identifier of the crawl origin, stored in checkpoints
    pub fn origin_key(&self) -> String {
        match self {
            Self::Site(root) => root.to_string(),
            Self::Repo(repo) => format!(
                "repo:{}/{}@{}:{}",
                repo.owner, repo.name, repo.branch, repo.path
            ),
        }
    }

    /// Name of the per-origin output directory
    ///
    /// Websites use the host with dots replaced and a leading `docs_` removed
    /// (`docs.example.com` becomes `example_com_site_docs`); repositories use
    /// `github_docs_<owner>_<repo>`.
    pub fn project_dir_name(&self) -> String {
        match self {
            Self::Site(root) => {
                let host = root.host_str().unwrap_or("site").replace('.', "_");
                let host = host.strip_prefix("docs_").unwrap_or(&host);
                format!("{}_site_docs", sanitize(host))
            }
            Self::Repo(repo) => format!(
                "github_docs_{}_{}",
                sanitize(&repo.owner),
                sanitize(&repo.name)
            ),
        }
    }

    /// Base name of the exported artifacts
    pub fn artifact_stem(&self) -> String {
        match self {
            Self::Site(root) => format!(
                "{}_docs",
                sanitize(&root.host_str().unwrap_or("site").replace('.', "_"))
            ),
            Self::Repo(repo) => format!("{}_{}_docs", sanitize(&repo.owner), sanitize(&repo.name)),
        }
    }

    /// Human-readable document title
    pub fn display_name(&self) -> String {
        match self {
            Self::Site(root) => root.host_str().unwrap_or("site").to_string(),
            Self::Repo(repo) => repo.label(),
        }
    }
}

/// Parses the command-line target into a website or repository target
///
/// # Examples
///
/// ```
/// use docs_harvester::config::GithubConfig;
/// use docs_harvester::url::{parse_target, Target};
///
/// let github = GithubConfig::default();
/// match parse_target("rust-lang/book/main/src", &github).unwrap() {
///     Target::Repo(repo) => {
///         assert_eq!(repo.branch, "main");
///         assert_eq!(repo.path, "src");
///     }
///     Target::Site(_) => unreachable!(),
/// }
/// ```
pub fn parse_target(input: &str, github: &GithubConfig) -> Result<Target, HarvestError> {
    let input = input.trim();
    let invalid = |reason: &str| HarvestError::InvalidTarget {
        target: input.to_string(),
        reason: reason.to_string(),
    };

    if input.is_empty() {
        return Err(invalid("target is empty"));
    }

    if input.starts_with("http://") || input.starts_with("https://") {
        let url = normalize_url(input)?;
        let host = url.host_str().unwrap_or_default();
        if host == "github.com" || host == "www.github.com" {
            let segments: Vec<&str> = url
                .path_segments()
                .map(|s| s.filter(|p| !p.is_empty()).collect())
                .unwrap_or_default();
            return parse_github_segments(&segments, github)
                .map(Target::Repo)
                .ok_or_else(|| invalid("need at least owner/repo"));
        }
        return Ok(Target::Site(url));
    }

    let first = input.split('/').next().unwrap_or_default();
    if first.contains('.') || first.contains(':') {
        // Bare host such as docs.example.com/guide
        let url = normalize_url(&format!("https://{}", input))?;
        return Ok(Target::Site(url));
    }

    let segments: Vec<&str> = input.split('/').filter(|p| !p.is_empty()).collect();
    if segments.len() < 2 {
        return Err(invalid("expected a URL or owner/name[/branch[/path]]"));
    }

    let branch = segments
        .get(2)
        .map(|b| b.to_string())
        .unwrap_or_else(|| github.default_branch.clone());
    let path = if segments.len() > 3 {
        segments[3..].join("/")
    } else {
        github.default_path.trim_matches('/').to_string()
    };

    Ok(Target::Repo(RepoRef {
        owner: segments[0].to_string(),
        name: strip_git_suffix(segments[1]),
        branch,
        path,
    }))
}

/// Parses `owner/repo[/tree/branch[/path]]` path segments of a github.com URL
fn parse_github_segments(segments: &[&str], github: &GithubConfig) -> Option<RepoRef> {
    if segments.len() < 2 {
        return None;
    }

    let mut branch = github.default_branch.clone();
    let mut path = github.default_path.trim_matches('/').to_string();

    if segments.len() >= 4 && (segments[2] == "tree" || segments[2] == "blob") {
        branch = segments[3].to_string();
        if segments.len() > 4 {
            path = segments[4..].join("/");
        }
    } else if segments.len() > 2 {
        path = segments[2..].join("/");
    }

    Some(RepoRef {
        owner: segments[0].to_string(),
        name: strip_git_suffix(segments[1]),
        branch,
        path,
    })
}

fn strip_git_suffix(name: &str) -> String {
    name.strip_suffix(".git").unwrap_or(name).to_string()
}

/// Keeps characters that are safe in file names
fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
