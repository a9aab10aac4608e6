//! Sumi-Trawl: a patient listing harvester
//!
//! This crate walks paginated listing sites, extracts structured records and
//! writes them to size-bounded CSV batches, retrying transient network failures
//! and refusing to repeat an expensive scrape whose output already exists.

pub mod config;
pub mod crawler;
pub mod output;
pub mod records;
pub mod state;

use thiserror::Error;

/// Main error type for Sumi-Trawl operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Failures of the fetch collaborator. These are the only errors the retry
/// executor is asked to repeat.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },
}

/// Errors raised while turning a fetched document into records
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A field the rule set marks as required is absent. Expected on real
    /// listings and never fatal.
    #[error("Missing {field} in {context}")]
    MissingData {
        field: &'static str,
        context: String,
    },

    #[error("Malformed {field} '{value}': {reason}")]
    Malformed {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Cannot resolve link '{href}': {source}")]
    InvalidLink {
        href: String,
        source: ::url::ParseError,
    },

    #[error("Invalid selector '{0}'")]
    Selector(String),
}

impl ExtractError {
    /// Returns true for the expected, recoverable missing-field case
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::MissingData { .. })
    }
}

/// Result type alias for Sumi-Trawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for extraction operations
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Extractor, ListingKind, RetryExecutor, ScrapeKind, ScrapePipeline};
pub use output::{ChunkedWriter, OverwritePolicy, RunGuard};
pub use records::Record;
pub use state::{CursorState, PaginationCursor};
