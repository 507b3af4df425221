use crate::config::types::{Config, CrawlerConfig, GithubConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_github_config(&config.github)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 0 and 10, got {}",
            config.max_retries
        )));
    }

    if config.backoff_base_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "backoff_base_ms must be <= 60000ms, got {}ms",
            config.backoff_base_ms
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.checkpoint_interval == 0 {
        return Err(ConfigError::Validation(
            "checkpoint_interval must be >= 1".to_string(),
        ));
    }

    if !(config.max_non_doc_ratio > 0.0 && config.max_non_doc_ratio <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "max_non_doc_ratio must be in (0, 1], got {}",
            config.max_non_doc_ratio
        )));
    }

    if let Some(prefix) = &config.path_prefix {
        if !prefix.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "path_prefix must start with '/', got '{}'",
                prefix
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    if config.formats.is_empty() {
        return Err(ConfigError::Validation(
            "at least one output format is required".to_string(),
        ));
    }

    if config.pdf_command.trim().is_empty() {
        return Err(ConfigError::Validation(
            "pdf_command cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates repository source configuration
fn validate_github_config(config: &GithubConfig) -> Result<(), ConfigError> {
    validate_base_url("api_base_url", &config.api_base_url)?;
    validate_base_url("raw_base_url", &config.raw_base_url)?;

    if config.default_branch.trim().is_empty() {
        return Err(ConfigError::Validation(
            "default_branch cannot be empty".to_string(),
        ));
    }

    if config.extensions.is_empty() {
        return Err(ConfigError::Validation(
            "at least one documentation extension is required".to_string(),
        ));
    }

    Ok(())
}

/// Base URLs must be absolute HTTP(S) URLs
fn validate_base_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_crawler_limits() {
        let mut config = CrawlerConfig::default();
        assert!(validate_crawler_config(&config).is_ok());

        config.max_pages = Some(0);
        assert!(validate_crawler_config(&config).is_err());

        config = CrawlerConfig {
            max_non_doc_ratio: 0.0,
            ..CrawlerConfig::default()
        };
        assert!(validate_crawler_config(&config).is_err());

        config = CrawlerConfig {
            checkpoint_interval: 0,
            ..CrawlerConfig::default()
        };
        assert!(validate_crawler_config(&config).is_err());

        config = CrawlerConfig {
            path_prefix: Some("docs".to_string()),
            ..CrawlerConfig::default()
        };
        assert!(validate_crawler_config(&config).is_err());
    }

    #[test]
    fn test_validate_crawler_name() {
        let mut config = UserAgentConfig::default();
        assert!(validate_user_agent_config(&config).is_ok());

        config.crawler_name = "Docs Harvester".to_string();
        assert!(validate_user_agent_config(&config).is_err());

        config.crawler_name = String::new();
        assert!(validate_user_agent_config(&config).is_err());
    }

    #[test]
    fn test_validate_output() {
        let mut config = OutputConfig::default();
        assert!(validate_output_config(&config).is_ok());

        config.formats.clear();
        assert!(validate_output_config(&config).is_err());

        config = OutputConfig {
            output_dir: PathBuf::new(),
            ..OutputConfig::default()
        };
        assert!(validate_output_config(&config).is_err());
    }

    #[test]
    fn test_validate_base_url() {
        assert!(validate_base_url("api", "https://api.github.com").is_ok());
        assert!(validate_base_url("api", "http://127.0.0.1:8080").is_ok());
        assert!(validate_base_url("api", "ftp://example.com").is_err());
        assert!(validate_base_url("api", "not a url").is_err());
    }
}
