use crate::config::types::{Config, OutputConfig, ScraperConfig, SourceConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_source_config(&config.source)?;
    Ok(())
}

/// Validates fetch and pagination settings
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page_size must be >= 1, got {}",
            config.page_size
        )));
    }

    if config.retry_attempts < 1 || config.retry_attempts > 20 {
        return Err(ConfigError::Validation(format!(
            "retry_attempts must be between 1 and 20, got {}",
            config.retry_attempts
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be >= 1s, got {}s",
            config.request_timeout
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
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

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.csv_dir.is_empty() {
        return Err(ConfigError::Validation("csv_dir cannot be empty".to_string()));
    }

    if config.rows_per_file < 1 {
        return Err(ConfigError::Validation(format!(
            "rows_per_file must be >= 1, got {}",
            config.rows_per_file
        )));
    }

    Ok(())
}

/// Validates the listing source
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let sites = Url::parse(&config.sites_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid sites_url: {}", e)))?;

    if sites.scheme() != "http" && sites.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "sites_url '{}' must use HTTP or HTTPS",
            config.sites_url
        )));
    }

    if config.search_path.trim_matches('/').is_empty() {
        return Err(ConfigError::Validation(
            "search_path cannot be empty".to_string(),
        ));
    }

    if config.offset_param.is_empty() {
        return Err(ConfigError::Validation(
            "offset_param cannot be empty".to_string(),
        ));
    }

    if config.search_params.contains_key(&config.offset_param) {
        return Err(ConfigError::Validation(format!(
            "search_params must not set the offset parameter '{}'",
            config.offset_param
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
