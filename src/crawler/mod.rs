//! Crawler module for listing pages
//!
//! This module contains the core scraping logic, including:
//! - HTTP fetching behind the [`Fetch`] trait
//! - Retrying failed fetches with a fixed delay
//! - Extracting records from fetched pages
//! - The fetch, extract, write pipeline and the scrape stages built on it

mod coordinator;
mod fetcher;
mod parser;
mod retry;
mod tasks;

pub use coordinator::{
    FetchRequest, Pagination, RunOutcome, ScrapePipeline, Target, TargetEnd, TargetReport,
};
pub use fetcher::{build_http_client, Fetch, HttpFetcher};
pub use parser::{Extraction, Extractor, ListingKind, PLACEHOLDER_COMPANY};
pub use retry::{RetryExecutor, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
pub use tasks::{
    job_links_root, DomainFilter, ScrapeKind, Trawler, DOMAINS_ROOT, JOB_DETAILS_ROOT,
    JOB_LINKS_ROOT,
};

use crate::config::Config;
use crate::output::{RunGuard, TrawlStatistics};
use crate::TrawlError;

/// Runs the given scrape stages over HTTP
///
/// This is the main entry point for a trawl. It will:
/// 1. Build the HTTP client from the user agent settings
/// 2. Set up the pipeline with the configured retry and throttle delays
/// 3. Run each stage in order, consulting `guard` before every output root
///
/// # Arguments
///
/// * `config` - The trawler configuration
/// * `guard` - Decides whether finished runs are repeated
/// * `filter` - Restricts which sites the job stage visits
/// * `kinds` - The stages to run
///
/// # Returns
///
/// * `Ok(TrawlStatistics)` - Every stage ran; individual failures are counted
/// * `Err(TrawlError)` - The client or extractors could not be built
pub async fn trawl(
    config: &Config,
    guard: RunGuard,
    filter: DomainFilter,
    kinds: &[ScrapeKind],
) -> Result<TrawlStatistics, TrawlError> {
    let client = build_http_client(&config.user_agent, &config.scraper)?;
    let trawler = Trawler::from_config(HttpFetcher::new(client), config, guard)?.with_filter(filter);
    Ok(trawler.run(kinds).await)
}
