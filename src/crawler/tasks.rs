//! The three scrape stages and their ordering
//!
//! | Stage | Input | Output root |
//! |-------|-------|-------------|
//! | `Domains` | the sites index | `domains` |
//! | `Jobs` | `domains*.csv` | `job_links-<site>` (one per site) |
//! | `Details` | `job_links*.csv` | `job_details` |
//!
//! Each site gets its own job link root, so a rerun after an interruption
//! skips (or asks about) the sites that were already finished.

use crate::config::{Config, SourceConfig};
use crate::crawler::coordinator::{FetchRequest, RunOutcome, ScrapePipeline, Target};
use crate::crawler::fetcher::Fetch;
use crate::crawler::parser::{Extractor, ListingKind};
use crate::output::{find_batches, read_batches, OutputError, RunGuard, TrawlStatistics};
use crate::records::{DomainListing, JobLink};
use crate::TrawlError;
use std::fmt;
use std::str::FromStr;
use url::Url;

pub const DOMAINS_ROOT: &str = "domains";
pub const JOB_LINKS_ROOT: &str = "job_links";
pub const JOB_DETAILS_ROOT: &str = "job_details";

/// A scrape stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrapeKind {
    Domains,
    Jobs,
    Details,
}

impl ScrapeKind {
    /// Every stage, in the order they depend on each other
    pub fn all() -> [Self; 3] {
        [Self::Domains, Self::Jobs, Self::Details]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domains => "domains",
            Self::Jobs => "jobs",
            Self::Details => "details",
        }
    }
}

impl fmt::Display for ScrapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScrapeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "domains" => Ok(Self::Domains),
            "jobs" => Ok(Self::Jobs),
            "details" => Ok(Self::Details),
            other => Err(format!(
                "unknown scrape type '{}', expected one of domains, jobs, details",
                other
            )),
        }
    }
}

/// Which sites the job stage visits
#[derive(Debug, Clone, Default)]
pub enum DomainFilter {
    #[default]
    All,

    /// Only sites whose URL contains one of these substrings
    Matching(Vec<String>),
}

impl DomainFilter {
    pub fn accepts(&self, url: &str) -> bool {
        match self {
            Self::All => true,
            Self::Matching(needles) => needles.iter().any(|n| url.contains(n.as_str())),
        }
    }
}

/// Output root for the job links of one site
///
/// The site's host, port and path are folded into `[a-z0-9_]`. A root never
/// ends in a digit, so batch numbers appended to it cannot form another
/// site's root.
pub fn job_links_root(site: &Url) -> String {
    let mut raw = site.host_str().unwrap_or_default().to_string();
    if let Some(port) = site.port() {
        raw.push_str(&format!("_{}", port));
    }
    raw.push_str(site.path());

    let slug: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let mut slug = slug.trim_matches('_').to_string();
    if slug.ends_with(|c: char| c.is_ascii_digit()) {
        slug.push('_');
    }
    format!("{}-{}", JOB_LINKS_ROOT, slug)
}

/// Runs scrape stages against one listing source
pub struct Trawler<F> {
    pipeline: ScrapePipeline<F>,
    source: SourceConfig,
    page_size: u32,
    filter: DomainFilter,
    domains: Extractor,
    job_links: Extractor,
    job_detail: Extractor,
}

impl<F: Fetch> Trawler<F> {
    pub fn new(pipeline: ScrapePipeline<F>, source: SourceConfig, page_size: u32) -> Result<Self, TrawlError> {
        Ok(Self {
            pipeline,
            source,
            page_size,
            filter: DomainFilter::All,
            domains: Extractor::new(ListingKind::Domains)?,
            job_links: Extractor::new(ListingKind::JobLinks)?,
            job_detail: Extractor::new(ListingKind::JobDetail)?,
        })
    }

    /// Builds a trawler whose pipeline follows `config`
    pub fn from_config(fetcher: F, config: &Config, guard: RunGuard) -> Result<Self, TrawlError> {
        let pipeline = ScrapePipeline::from_config(fetcher, config, guard);
        Self::new(pipeline, config.source.clone(), config.scraper.page_size)
    }

    pub fn with_filter(mut self, filter: DomainFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Runs `kinds` in the given order and collects statistics
    ///
    /// A stage that fails or is skipped does not stop later stages; they
    /// work from whatever batches are on disk.
    pub async fn run(&self, kinds: &[ScrapeKind]) -> TrawlStatistics {
        let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
        tracing::info!("Running scraper with methods {}", names.join(", "));

        let mut stats = TrawlStatistics::default();
        for kind in kinds {
            match kind {
                ScrapeKind::Domains => stats.record(&self.scrape_domains().await),
                ScrapeKind::Jobs => {
                    for outcome in self.scrape_jobs().await {
                        stats.record(&outcome);
                    }
                }
                ScrapeKind::Details => stats.record(&self.scrape_details().await),
            }
        }
        stats
    }

    /// Scrapes the sites index into the `domains` batches
    pub async fn scrape_domains(&self) -> RunOutcome {
        tracing::debug!("Scraping domains, hitting endpoint {}", self.source.sites_url);

        let url = match Url::parse(&self.source.sites_url) {
            Ok(url) => url,
            Err(e) => {
                return RunOutcome::Failed {
                    root: DOMAINS_ROOT.to_string(),
                    targets: Vec::new(),
                    error: e.into(),
                }
            }
        };

        let target = Target::single("sites index", FetchRequest::new(url));
        self.pipeline.run(DOMAINS_ROOT, &self.domains, vec![target]).await
    }

    /// Sites known from earlier `domains` batches that pass the filter
    pub fn known_domains(&self) -> Result<Vec<DomainListing>, OutputError> {
        let files = find_batches(self.pipeline.output_dir(), DOMAINS_ROOT)?;
        if files.is_empty() {
            tracing::warn!("No files found with root filename {}", DOMAINS_ROOT);
        }

        let domains: Vec<DomainListing> = read_batches(&files)?;
        Ok(domains
            .into_iter()
            .filter(|d| self.filter.accepts(&d.url))
            .collect())
    }

    /// Walks the job search of every known site, one output root per site
    pub async fn scrape_jobs(&self) -> Vec<RunOutcome> {
        tracing::debug!("Scraping jobs");

        let domains = match self.known_domains() {
            Ok(domains) => domains,
            Err(e) => {
                return vec![RunOutcome::Failed {
                    root: JOB_LINKS_ROOT.to_string(),
                    targets: Vec::new(),
                    error: e.into(),
                }]
            }
        };
        if domains.is_empty() {
            return vec![RunOutcome::NothingToDo {
                root: JOB_LINKS_ROOT.to_string(),
            }];
        }

        let mut outcomes = Vec::with_capacity(domains.len());
        for domain in domains {
            let target = match self.search_target(&domain) {
                Ok(target) => target,
                Err(e) => {
                    tracing::warn!("Skipping site {} ({}): {}", domain.city, domain.url, e);
                    continue;
                }
            };

            if outcomes.last().is_some_and(|o: &RunOutcome| !o.is_skipped()) {
                tokio::time::sleep(self.pipeline.throttle()).await;
            }

            let root = job_links_root(&target.request.url);
            let outcome = self.pipeline.run(&root, &self.job_links, vec![target]).await;
            outcomes.push(outcome);
        }
        outcomes
    }

    fn search_target(&self, domain: &DomainListing) -> Result<Target, url::ParseError> {
        let site = Url::parse(&domain.url)?;
        let search = site.join(&self.source.search_path)?;
        let request = FetchRequest::new(search).with_query(self.source.search_params.clone());

        Ok(Target::paginated(
            domain.city.clone(),
            request,
            self.source.offset_param.clone(),
            self.page_size,
        ))
    }

    /// Visits every known job link and scrapes its details
    pub async fn scrape_details(&self) -> RunOutcome {
        tracing::debug!("Scraping job details");

        let links = find_batches(self.pipeline.output_dir(), JOB_LINKS_ROOT)
            .and_then(|files| read_batches::<JobLink>(&files));
        let links = match links {
            Ok(links) => links,
            Err(e) => {
                return RunOutcome::Failed {
                    root: JOB_DETAILS_ROOT.to_string(),
                    targets: Vec::new(),
                    error: e.into(),
                }
            }
        };

        let mut targets = Vec::with_capacity(links.len());
        for link in links {
            match Url::parse(&link.url) {
                Ok(url) => targets.push(Target::single(link.url.clone(), FetchRequest::new(url))),
                Err(e) => tracing::warn!("Skipping job link '{}': {}", link.url, e),
            }
        }

        if targets.is_empty() {
            tracing::warn!("No files found with root filename {}", JOB_LINKS_ROOT);
            return RunOutcome::NothingToDo {
                root: JOB_DETAILS_ROOT.to_string(),
            };
        }

        self.pipeline
            .run(JOB_DETAILS_ROOT, &self.job_detail, targets)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::batch_path;

    #[test]
    fn test_job_links_root() {
        let site = Url::parse("http://minneapolis.craigslist.org/").unwrap();
        assert_eq!(job_links_root(&site), "job_links-minneapolis_craigslist_org");

        let local = Url::parse("http://127.0.0.1:8080/stpaul/search/jjj").unwrap();
        assert_eq!(job_links_root(&local), "job_links-127_0_0_1_8080_stpaul_search_jjj");

        let port_only = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(job_links_root(&port_only), "job_links-127_0_0_1_8080_");
    }

    #[test]
    fn test_job_links_roots_ending_in_digits_do_not_collide() {
        let dir = std::path::Path::new("/out");
        let area1 = job_links_root(&Url::parse("http://example.org/area1").unwrap());
        let area11 = job_links_root(&Url::parse("http://example.org/area11").unwrap());
        assert_eq!(area1, "job_links-example_org_area1_");

        for index in 0..20 {
            assert_ne!(batch_path(dir, &area1, index), batch_path(dir, &area11, 0));
        }
    }

    #[test]
    fn test_domain_filter() {
        assert!(DomainFilter::All.accepts("http://anything/"));

        let filter = DomainFilter::Matching(vec!["duluth".to_string(), "fargo".to_string()]);
        assert!(filter.accepts("http://duluth.craigslist.org/"));
        assert!(!filter.accepts("http://minneapolis.craigslist.org/"));
    }

    #[test]
    fn test_scrape_kind_parsing() {
        assert_eq!("jobs".parse::<ScrapeKind>(), Ok(ScrapeKind::Jobs));
        assert!("everything".parse::<ScrapeKind>().is_err());
        assert_eq!(ScrapeKind::all()[0], ScrapeKind::Domains);
    }
}
