use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Docs-Harvester
///
/// Every section and field has a default, so an empty TOML file (or no file
/// at all) yields a usable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub github: GithubConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of pages to fetch (unbounded when absent)
    pub max_pages: Option<u32>,

    /// Maximum link depth from the root (unbounded when absent)
    pub max_depth: Option<u32>,

    /// Delay applied after every network request (milliseconds)
    pub request_delay_ms: u64,

    /// Retries after the first attempt for transient failures
    pub max_retries: u32,

    /// Base backoff delay, doubled on every retry (milliseconds)
    pub backoff_base_ms: u64,

    /// Per-request client timeout (seconds)
    pub request_timeout_secs: u64,

    /// Save a checkpoint every N examined pages
    pub checkpoint_interval: u32,

    /// Abort after more than this many near-empty pages in a row
    pub max_consecutive_non_doc: u32,

    /// Abort when the near-empty share of examined pages exceeds this ratio
    pub max_non_doc_ratio: f64,

    /// Pages examined before the ratio check applies
    pub non_doc_min_sample: u32,

    /// Pages with less extracted text than this count as near-empty
    pub min_content_chars: usize,

    /// Restrict website crawls to paths under this prefix
    pub path_prefix: Option<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: None,
            max_depth: None,
            request_delay_ms: 500,
            max_retries: 3,
            backoff_base_ms: 500,
            request_timeout_secs: 30,
            checkpoint_interval: 10,
            max_consecutive_non_doc: 5,
            max_non_doc_ratio: 0.5,
            non_doc_min_sample: 10,
            min_content_chars: 20,
            path_prefix: None,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "DocsHarvester".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://github.com/docs-harvester/docs-harvester".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the client identifier sent with every request
    ///
    /// Format: `CrawlerName/Version (+ContactURL)`
    pub fn user_agent_string(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Html,
    Pdf,
    Markdown,
}

impl Format {
    /// File extension of the artifact
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Markdown => "md",
        }
    }

    /// Parses a format name as given on the command line
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "html" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            "markdown" | "md" => Some(Self::Markdown),
            _ => None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root directory; each crawled origin gets its own subdirectory
    pub output_dir: PathBuf,

    /// Artifacts to produce
    pub formats: Vec<Format>,

    /// Omit images from every artifact
    pub no_images: bool,

    /// Resume from the saved checkpoint when one exists
    pub incremental: bool,

    /// HTTP cache TTL in seconds (0 disables the cache)
    pub cache_ttl: u64,

    /// External program that renders HTML into PDF
    pub pdf_command: String,

    /// Extra arguments passed to the PDF program before the input and output paths
    pub pdf_args: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("harvested_docs"),
            formats: vec![Format::Json, Format::Html, Format::Pdf],
            no_images: false,
            incremental: false,
            cache_ttl: 0,
            pdf_command: "weasyprint".to_string(),
            pdf_args: Vec::new(),
        }
    }
}

/// Repository source configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GithubConfig {
    /// Access token raising the API rate limit
    pub token: Option<String>,

    /// Base URL of the contents API
    pub api_base_url: String,

    /// Base URL serving raw file contents
    pub raw_base_url: String,

    /// Branch used when the target names none
    pub default_branch: String,

    /// Docs directory used when the target names none
    pub default_path: String,

    /// File extensions treated as documentation
    pub extensions: Vec<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base_url: "https://api.github.com".to_string(),
            raw_base_url: "https://raw.githubusercontent.com".to_string(),
            default_branch: "main".to_string(),
            default_path: "docs".to_string(),
            extensions: vec!["md".to_string(), "markdown".to_string()],
        }
    }
}
