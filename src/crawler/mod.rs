//! Crawler module for documentation harvesting
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with caching, retry and politeness delay
//! - Content extraction from HTML and Markdown
//! - Frontier scheduling and safety limits
//! - Website and repository sources
//! - Overall crawl coordination and shutdown signals

mod coordinator;
mod fetcher;
mod markdown;
mod outcome;
mod parser;
mod repo;
mod scheduler;
mod shutdown;
mod site;
mod source;

pub use coordinator::{write_raw_document, Coordinator};
pub use fetcher::{build_http_client, FailureKind, FetchPolicy, FetchResult, Fetcher};
pub use markdown::{extract_markdown, normalize_markdown, strip_front_matter};
pub use outcome::{AbortReason, CrawlReport, RunOutcome};
pub use parser::{extract, extract_html, ContentStrategy, ExtractOptions, Extraction, STRATEGIES};
pub use repo::RepoSource;
pub use scheduler::{failure_action, CrawlLimits, FailureAction, PageOutcome, Scheduler};
pub use shutdown::shutdown_signal;
pub use site::SiteSource;
pub use source::{DocSource, RawDocument, Visit};

use crate::cache::{ResponseCache, SqliteCache};
use crate::config::Config;
use crate::output::{export, CommandRenderer, ExportContext, PdfRenderer};
use crate::storage::JsonStateStore;
use crate::url::Target;
use crate::HarvestError;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

/// File name of the response cache inside a project directory
pub const CACHE_FILE_NAME: &str = ".harvest_cache.sqlite";

/// Directory receiving raw repository documents inside a project directory
pub const RAW_DIR_NAME: &str = "markdown";

/// What a harvest produced
#[derive(Debug)]
pub struct HarvestSummary {
    pub outcome: RunOutcome,
    /// Per-origin output directory
    pub project_dir: PathBuf,
    /// Pages with content
    pub pages: usize,
    /// Pages whose fetch failed
    pub failed: usize,
    pub artifacts: Vec<PathBuf>,
    pub requests_issued: u64,
}

/// Runs a complete harvest of `target`
///
/// This is the main entry point for a run. It will:
/// 1. Create the project directory and open the response cache
/// 2. Build the HTTP client and the source for the target
/// 3. Crawl until completion, abort or `shutdown`
/// 4. Export the page set in the configured formats
///
/// PDFs are rendered with the configured external command.
///
/// # Arguments
///
/// * `config` - The merged and validated configuration
/// * `target` - What to crawl
/// * `shutdown` - Resolves when the run should stop early
///
/// # Returns
///
/// * `Ok(HarvestSummary)` - The run finished (possibly aborted)
/// * `Err(HarvestError)` - A run-level failure
///
/// # Example
///
/// ```no_run
/// use docs_harvester::config::Config;
/// use docs_harvester::crawler::{harvest, shutdown_signal};
/// use docs_harvester::url::parse_target;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let target = parse_target("https://docs.example.com/", &config.github)?;
/// let shutdown = shutdown_signal()?;
/// let summary = harvest(&config, &target, shutdown).await?;
/// println!("{}", summary.outcome);
/// # Ok(())
/// # }
/// ```
pub async fn harvest<F>(
    config: &Config,
    target: &Target,
    shutdown: F,
) -> Result<HarvestSummary, HarvestError>
where
    F: Future<Output = ()>,
{
    let renderer = CommandRenderer::new(
        config.output.pdf_command.clone(),
        config.output.pdf_args.clone(),
    );
    harvest_with_renderer(config, target, shutdown, &renderer).await
}

/// Runs a complete harvest of `target`, rendering PDFs with `renderer`
pub async fn harvest_with_renderer<F>(
    config: &Config,
    target: &Target,
    shutdown: F,
    renderer: &dyn PdfRenderer,
) -> Result<HarvestSummary, HarvestError>
where
    F: Future<Output = ()>,
{
    let project_dir = config.output.output_dir.join(target.project_dir_name());
    std::fs::create_dir_all(&project_dir)?;
    tracing::info!(
        "Harvesting {} into {}",
        target.display_name(),
        project_dir.display()
    );

    let client = build_http_client(
        &config.user_agent,
        Duration::from_secs(config.crawler.request_timeout_secs),
    )?;

    let cache: Option<Box<dyn ResponseCache>> = if config.output.cache_ttl > 0 {
        let mut cache = SqliteCache::new(&project_dir.join(CACHE_FILE_NAME))?;
        let purged = cache.purge_expired()?;
        if purged > 0 {
            tracing::debug!("Purged {} expired cache entries", purged);
        }
        Some(Box::new(cache))
    } else {
        None
    };

    let fetcher = Fetcher::new(client, cache, FetchPolicy::from_config(config));
    let scheduler = Scheduler::new(CrawlLimits::from_config(&config.crawler));
    let store = Box::new(JsonStateStore::in_project(&project_dir, target.origin_key()));
    let options = ExtractOptions {
        strip_images: config.output.no_images,
    };
    let incremental = config.output.incremental;

    let report = match target {
        Target::Site(root) => {
            let source = SiteSource::new(
                root.clone(),
                config.crawler.path_prefix.as_deref(),
                options,
            );
            Coordinator::new(source, fetcher, scheduler, store, target.origin_key(), incremental)?
                .run_until(shutdown)
                .await?
        }
        Target::Repo(repo) => {
            let source = RepoSource::new(
                repo.clone(),
                &config.github,
                config.github.token.clone(),
                options,
            )?;
            Coordinator::new(source, fetcher, scheduler, store, target.origin_key(), incremental)?
                .with_raw_dir(project_dir.join(RAW_DIR_NAME))
                .run_until(shutdown)
                .await?
        }
    };

    let pages = report.state.pages.content_count();
    let failed = report.state.pages.len() - pages;

    let artifacts = if pages > 0 {
        let stem = target.artifact_stem();
        let title = target.display_name();
        let ctx = ExportContext {
            dir: &project_dir,
            stem: &stem,
            title: &title,
            strip_images: config.output.no_images,
            renderer,
        };
        export(report.state.pages.as_slice(), &config.output.formats, &ctx)?
    } else {
        tracing::warn!("No pages with content; nothing to export");
        Vec::new()
    };

    Ok(HarvestSummary {
        outcome: report.outcome,
        project_dir,
        pages,
        failed,
        artifacts,
        requests_issued: report.requests_issued,
    })
}
