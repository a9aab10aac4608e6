use indexmap::IndexMap;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sumi-Trawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub source: SourceConfig,
}

/// Fetch, retry and pagination behavior
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Number of listings a full result page carries
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Maximum fetch attempts per page before the target is abandoned
    #[serde(rename = "retry-attempts", default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay between fetch attempts (seconds)
    #[serde(rename = "retry-delay", default = "default_delay_secs")]
    pub retry_delay: u64,

    /// Delay between consecutive page fetches (seconds)
    #[serde(rename = "throttle-delay", default = "default_delay_secs")]
    pub throttle_delay: u64,

    /// Per-request timeout handed to the HTTP client (seconds)
    #[serde(rename = "request-timeout", default = "default_delay_secs")]
    pub request_timeout: u64,
}

impl ScraperConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }

    pub fn throttle_delay(&self) -> Duration {
        Duration::from_secs(self.throttle_delay)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            retry_attempts: default_retry_attempts(),
            retry_delay: default_delay_secs(),
            throttle_delay: default_delay_secs(),
            request_timeout: default_delay_secs(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory the CSV batches are written to
    #[serde(rename = "csv-dir", default = "default_csv_dir")]
    pub csv_dir: String,

    /// Maximum data rows per batch file
    #[serde(rename = "rows-per-file", default = "default_rows_per_file")]
    pub rows_per_file: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_dir: default_csv_dir(),
            rows_per_file: default_rows_per_file(),
        }
    }
}

/// Where listings are discovered and how result pages are addressed
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Index page listing every regional site
    #[serde(rename = "sites-url")]
    pub sites_url: String,

    /// Search path appended to each regional site
    #[serde(rename = "search-path", default = "default_search_path")]
    pub search_path: String,

    /// Query parameter carrying the result offset
    #[serde(rename = "offset-param", default = "default_offset_param")]
    pub offset_param: String,

    /// Fixed query parameters sent with every search page, in file order
    #[serde(rename = "search-params", default)]
    pub search_params: IndexMap<String, String>,
}

fn default_page_size() -> u32 {
    100
}

fn default_retry_attempts() -> u32 {
    5
}

fn default_delay_secs() -> u64 {
    30
}

fn default_csv_dir() -> String {
    "./csv".to_string()
}

fn default_rows_per_file() -> usize {
    1000
}

fn default_search_path() -> String {
    "search/jjj".to_string()
}

fn default_offset_param() -> String {
    "s".to_string()
}
