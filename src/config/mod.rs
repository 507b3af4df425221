//! Configuration module for Docs-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Command-line flags are applied on top of the loaded values by the
//! binary, and the merged result is validated once more before a run starts.
//!
//! # Example
//!
//! ```no_run
//! use docs_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! println!("Request delay: {}ms", config.crawler.request_delay_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, Format, GithubConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
