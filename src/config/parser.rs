use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so two runs can be told apart by the settings they used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const USER_AGENT: &str = r#"
[user-agent]
crawler-name = "TestTrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"
"#;

    #[test]
    fn test_load_valid_config() {
        let config_content = format!(
            r#"
[scraper]
page-size = 120
retry-attempts = 3
retry-delay = 5
throttle-delay = 10

{USER_AGENT}

[output]
csv-dir = "./out"
rows-per-file = 500

[source]
sites-url = "http://www.craigslist.org/about/sites"
offset-param = "s"

[source.search-params]
employment_type = "1"
"#
        );

        let file = create_temp_config(&config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.scraper.page_size, 120);
        assert_eq!(config.scraper.retry_attempts, 3);
        assert_eq!(config.scraper.throttle_delay().as_secs(), 10);
        assert_eq!(config.output.rows_per_file, 500);
        assert_eq!(config.source.search_path, "search/jjj");
        assert_eq!(
            config.source.search_params.get("employment_type"),
            Some(&"1".to_string())
        );
    }

    #[test]
    fn test_search_params_keep_file_order() {
        let config_content = format!(
            r#"
{USER_AGENT}

[source]
sites-url = "http://www.craigslist.org/about/sites"

[source.search-params]
sort = "date"
employment_type = "1"
bundle_duplicates = "1"
"#
        );

        let file = create_temp_config(&config_content);
        let config = load_config(file.path()).unwrap();

        let keys: Vec<&str> = config.source.search_params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["sort", "employment_type", "bundle_duplicates"]);
    }

    #[test]
    fn test_defaults_applied() {
        let config_content = format!(
            r#"
{USER_AGENT}

[source]
sites-url = "http://www.craigslist.org/about/sites"
"#
        );

        let file = create_temp_config(&config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.scraper.page_size, 100);
        assert_eq!(config.scraper.retry_attempts, 5);
        assert_eq!(config.scraper.retry_delay().as_secs(), 30);
        assert_eq!(config.output.rows_per_file, 1000);
        assert_eq!(config.output.csv_dir, "./csv");
        assert_eq!(config.source.offset_param, "s");
        assert!(config.source.search_params.is_empty());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/trawl.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = format!(
            r#"
[scraper]
page-size = 0

{USER_AGENT}

[source]
sites-url = "http://www.craigslist.org/about/sites"
"#
        );

        let file = create_temp_config(&config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
