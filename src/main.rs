//! Docs-Harvester main entry point
//!
//! This is the command-line interface for the Docs-Harvester documentation
//! crawler.

use anyhow::Context;
use clap::Parser;
use docs_harvester::config::{load_config, validate, Config, Format};
use docs_harvester::crawler::{harvest, shutdown_signal};
use docs_harvester::url::{parse_target, Target};
use docs_harvester::RunOutcome;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Docs-Harvester: crawl documentation into one document
///
/// Docs-Harvester crawls a documentation website or a repository docs
/// directory, extracts the content of every page, and assembles the pages
/// into JSON, HTML, PDF and Markdown artifacts.
#[derive(Parser, Debug)]
#[command(name = "docs-harvester")]
#[command(version)]
#[command(about = "Harvest documentation into a single document", long_about = None)]
struct Cli {
    /// Website root URL, owner/name[/branch[/path]], or a github.com repository URL
    #[arg(value_name = "TARGET")]
    target: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of pages to fetch
    #[arg(long)]
    max_pages: Option<u32>,

    /// Maximum link depth from the root
    #[arg(long)]
    max_depth: Option<u32>,

    /// Root directory for output
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Artifacts to produce: json, html, pdf, markdown (repeatable or comma separated)
    #[arg(short, long, value_delimiter = ',')]
    format: Vec<String>,

    /// Leave images out of every artifact
    #[arg(long)]
    no_images: bool,

    /// Resume from the saved checkpoint and keep it afterwards
    #[arg(long)]
    incremental: bool,

    /// HTTP cache TTL in seconds (0 disables the cache)
    #[arg(long, value_name = "SECS")]
    cache_ttl: Option<u64>,

    /// Access token for the repository host
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Only crawl website paths under this prefix
    #[arg(long)]
    path_prefix: Option<String>,

    /// Delay after every network request in milliseconds
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

    /// Show the effective configuration and target without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code() as u8),
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("docs_harvester=info,warn"),
            1 => EnvFilter::new("docs_harvester=debug,info"),
            2 => EnvFilter::new("docs_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<RunOutcome> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    apply_overrides(&mut config, &cli)?;
    validate(&config).context("invalid configuration")?;

    let target = parse_target(&cli.target, &config.github)?;

    if cli.dry_run {
        print_dry_run(&config, &target);
        return Ok(RunOutcome::Completed);
    }

    let shutdown = shutdown_signal().context("failed to install signal handlers")?;
    let summary = harvest(&config, &target, shutdown).await?;

    match summary.outcome {
        RunOutcome::Completed => println!(
            "Harvested {} pages ({} failed) from {}",
            summary.pages,
            summary.failed,
            target.display_name()
        ),
        RunOutcome::Aborted(reason) => println!(
            "Aborted after {} pages from {}: {}",
            summary.pages,
            target.display_name(),
            reason
        ),
    }
    for artifact in &summary.artifacts {
        println!("  {}", artifact.display());
    }

    Ok(summary.outcome)
}

/// Applies command-line flags on top of the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if cli.max_pages.is_some() {
        config.crawler.max_pages = cli.max_pages;
    }
    if cli.max_depth.is_some() {
        config.crawler.max_depth = cli.max_depth;
    }
    if let Some(delay) = cli.delay_ms {
        config.crawler.request_delay_ms = delay;
    }
    if let Some(prefix) = &cli.path_prefix {
        config.crawler.path_prefix = Some(prefix.clone());
    }
    if let Some(dir) = &cli.output_dir {
        config.output.output_dir = dir.clone();
    }
    if !cli.format.is_empty() {
        let mut formats = Vec::new();
        for name in cli.format.iter().filter(|n| !n.trim().is_empty()) {
            let format = Format::parse(name)
                .with_context(|| format!("unknown format '{}'", name.trim()))?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        config.output.formats = formats;
    }
    if cli.no_images {
        config.output.no_images = true;
    }
    if cli.incremental {
        config.output.incremental = true;
    }
    if let Some(ttl) = cli.cache_ttl {
        config.output.cache_ttl = ttl;
    }
    if let Some(token) = &cli.auth_token {
        config.github.token = Some(token.clone());
    }
    Ok(())
}

/// Handles the --dry-run mode: shows what would be crawled
fn print_dry_run(config: &Config, target: &Target) {
    println!("=== Docs-Harvester Dry Run ===\n");

    match target {
        Target::Site(root) => println!("Website: {}", root),
        Target::Repo(repo) => println!(
            "Repository: {} (branch {}, path {})",
            repo.label(),
            repo.branch,
            repo.path
        ),
    }
    println!(
        "Output: {}",
        config
            .output
            .output_dir
            .join(target.project_dir_name())
            .display()
    );

    println!("\nCrawler Configuration:");
    println!("  Max pages: {}", limit(config.crawler.max_pages));
    println!("  Max depth: {}", limit(config.crawler.max_depth));
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  User agent: {}", config.user_agent.user_agent_string());

    let formats: Vec<&str> = config
        .output
        .formats
        .iter()
        .map(|f| f.extension())
        .collect();
    println!("\nFormats: {}", formats.join(", "));
    println!("Cache TTL: {}s", config.output.cache_ttl);
    println!("Incremental: {}", config.output.incremental);
    println!(
        "Auth token: {}",
        if config.github.token.is_some() { "set" } else { "not set" }
    );
}

fn limit(value: Option<u32>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unlimited".to_string())
}
