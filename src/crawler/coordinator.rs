//! Scrape coordinator - the fetch, extract, write loop
//!
//! One call to [`ScrapePipeline::run`] produces one output root from one or
//! more targets:
//! - A writer is opened for the root (the run guard may skip the whole run)
//! - Each target is fetched through the retry executor
//! - Fetched pages are handed to the extractor and records to the writer
//! - Paginated targets advance their cursor until it is exhausted
//! - The writer is closed exactly once, whatever happened
//!
//! A target whose fetch keeps failing is abandoned and the run moves on to the
//! next target. Only output errors end a run early.

use crate::config::Config;
use crate::crawler::fetcher::Fetch;
use crate::crawler::parser::Extractor;
use crate::crawler::retry::RetryExecutor;
use crate::output::{BatchSummary, ChunkedWriter, OutputResult, RunGuard};
use crate::state::PaginationCursor;
use crate::{TransportError, TrawlError};
use scraper::Html;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Instrument;
use url::Url;

/// A URL plus the query parameters sent with it
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,

    /// Query parameters in the order they are sent
    pub query: Vec<(String, String)>,

    /// Overrides the pipeline's throttle delay between pages
    pub throttle: Option<Duration>,
}

impl FetchRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            query: Vec::new(),
            throttle: None,
        }
    }

    pub fn with_query<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in params {
            self.set_param(name, value);
        }
        self
    }

    /// Sets a query parameter, replacing it in place if already present
    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.query.iter_mut().find(|(k, _)| *k == name) {
            Some(param) => param.1 = value,
            None => self.query.push((name, value)),
        }
    }
}

/// Offset bookkeeping for a paginated target
#[derive(Debug, Clone)]
pub struct Pagination {
    /// Query parameter carrying the offset
    pub offset_param: String,
    pub cursor: PaginationCursor,
}

/// One entity to scrape: a single page, or a paginated result set
#[derive(Debug, Clone)]
pub struct Target {
    /// Name used in logs and reports
    pub label: String,
    pub request: FetchRequest,
    pub pagination: Option<Pagination>,
}

impl Target {
    /// A target that is fetched exactly once
    pub fn single(label: impl Into<String>, request: FetchRequest) -> Self {
        Self {
            label: label.into(),
            request,
            pagination: None,
        }
    }

    /// A target walked page by page until a short page comes back
    pub fn paginated(
        label: impl Into<String>,
        request: FetchRequest,
        offset_param: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            label: label.into(),
            request,
            pagination: Some(Pagination {
                offset_param: offset_param.into(),
                cursor: PaginationCursor::new(page_size),
            }),
        }
    }
}

/// Why a target stopped
#[derive(Debug)]
pub enum TargetEnd {
    /// The remote ran out of data (or the single page was processed)
    Exhausted,

    /// The retry budget for a page fetch was spent
    FetchFailed(TransportError),
}

/// What happened to one target
#[derive(Debug)]
pub struct TargetReport {
    pub label: String,
    pub pages: usize,
    pub records: usize,
    pub skipped: usize,
    pub end: TargetEnd,
}

impl TargetReport {
    fn new(label: String) -> Self {
        Self {
            label,
            pages: 0,
            records: 0,
            skipped: 0,
            end: TargetEnd::Exhausted,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.end, TargetEnd::FetchFailed(_))
    }
}

/// Result of one run over one output root
#[derive(Debug)]
pub enum RunOutcome {
    /// All targets were attempted and the writer closed cleanly
    Completed {
        summary: BatchSummary,
        targets: Vec<TargetReport>,
    },

    /// Output from an earlier run exists and repeating it was declined
    Skipped { root: String },

    /// There were no targets to scrape
    NothingToDo { root: String },

    /// Writing output failed; whatever was flushed before stays on disk
    Failed {
        root: String,
        targets: Vec<TargetReport>,
        error: TrawlError,
    },
}

impl RunOutcome {
    pub fn root(&self) -> &str {
        match self {
            Self::Completed { summary, .. } => &summary.root,
            Self::Skipped { root } | Self::NothingToDo { root } | Self::Failed { root, .. } => root,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn targets(&self) -> &[TargetReport] {
        match self {
            Self::Completed { targets, .. } | Self::Failed { targets, .. } => targets,
            Self::Skipped { .. } | Self::NothingToDo { .. } => &[],
        }
    }
}

/// Drives fetch, extract and write for one output root at a time
pub struct ScrapePipeline<F> {
    fetcher: F,
    retry: RetryExecutor,
    throttle: Duration,
    output_dir: PathBuf,
    rows_per_file: usize,
    guard: RunGuard,
}

impl<F: Fetch> ScrapePipeline<F> {
    pub fn new(
        fetcher: F,
        retry: RetryExecutor,
        throttle: Duration,
        output_dir: impl Into<PathBuf>,
        rows_per_file: usize,
        guard: RunGuard,
    ) -> Self {
        Self {
            fetcher,
            retry,
            throttle,
            output_dir: output_dir.into(),
            rows_per_file,
            guard,
        }
    }

    /// Creates a pipeline using the retry, throttle and output settings of `config`
    pub fn from_config(fetcher: F, config: &Config, guard: RunGuard) -> Self {
        Self::new(
            fetcher,
            RetryExecutor::new(config.scraper.retry_attempts, config.scraper.retry_delay()),
            config.scraper.throttle_delay(),
            &config.output.csv_dir,
            config.output.rows_per_file,
            guard,
        )
    }

    pub fn output_dir(&self) -> &std::path::Path {
        &self.output_dir
    }

    pub fn throttle(&self) -> Duration {
        self.throttle
    }

    /// Scrapes `targets` in order into the batches of `root`
    ///
    /// Targets are separated by the throttle delay. A target whose fetch fails
    /// after all retries is reported and the next target is started.
    pub async fn run(&self, root: &str, extractor: &Extractor, targets: Vec<Target>) -> RunOutcome {
        let mut writer = match ChunkedWriter::open(
            &self.output_dir,
            root,
            extractor.kind().header(),
            self.rows_per_file,
            &self.guard,
        ) {
            Ok(writer) => writer,
            Err(e) if e.is_skip() => {
                tracing::info!("Skipping an intensive operation: {}", e);
                return RunOutcome::Skipped {
                    root: root.to_string(),
                };
            }
            Err(e) => {
                return RunOutcome::Failed {
                    root: root.to_string(),
                    targets: Vec::new(),
                    error: e.into(),
                }
            }
        };

        tracing::info!("Scraping {} target(s) into '{}'", targets.len(), root);

        let mut reports = Vec::with_capacity(targets.len());
        let mut failure = None;

        for (position, target) in targets.into_iter().enumerate() {
            if position > 0 {
                self.pause(self.throttle).await;
            }

            let span = tracing::info_span!("target", label = %target.label);
            match self.run_target(target, extractor, &mut writer).instrument(span).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::error!("Output for '{}' failed: {}", root, e);
                    failure = Some(e);
                    break;
                }
            }
        }

        let closed = writer.close();
        match (failure, closed) {
            (None, Ok(summary)) => RunOutcome::Completed {
                summary,
                targets: reports,
            },
            (Some(e), _) | (None, Err(e)) => RunOutcome::Failed {
                root: root.to_string(),
                targets: reports,
                error: e.into(),
            },
        }
    }

    /// Walks one target until its cursor is exhausted or a fetch gives up
    ///
    /// Only output errors are returned as `Err`; fetch failures end up in the
    /// report.
    async fn run_target(
        &self,
        target: Target,
        extractor: &Extractor,
        writer: &mut ChunkedWriter,
    ) -> OutputResult<TargetReport> {
        let Target {
            label,
            mut request,
            mut pagination,
        } = target;
        let mut report = TargetReport::new(label);

        loop {
            if let Some(paging) = &pagination {
                request.set_param(&paging.offset_param, paging.cursor.offset().to_string());
            }

            tracing::debug!("Hitting {} w/params {:?}", request.url, request.query);
            let fetched = self
                .retry
                .execute(
                    || self.fetcher.fetch(&request.url, &request.query),
                    |attempt, e| {
                        tracing::warn!(
                            "Fetch attempt {}/{} for {} failed: {}",
                            attempt,
                            self.retry.max_attempts(),
                            request.url,
                            e
                        )
                    },
                )
                .await;

            let body = match fetched {
                Ok(body) => body,
                Err(e) => {
                    tracing::error!("Giving up on {} after retries: {}", request.url, e);
                    report.end = TargetEnd::FetchFailed(e);
                    return Ok(report);
                }
            };
            report.pages += 1;

            let listings = extract_into(&body, &request.url, extractor, writer, &mut report)?;

            let Some(paging) = pagination.as_mut() else {
                break;
            };
            if paging.cursor.advance(listings).is_terminal() {
                tracing::debug!(
                    "Paginated scraping complete after {} page(s)",
                    report.pages
                );
                break;
            }

            self.pause(request.throttle.unwrap_or(self.throttle)).await;
        }

        tracing::info!(
            "Finished {}: {} page(s), {} record(s), {} skipped",
            report.label,
            report.pages,
            report.records,
            report.skipped
        );
        Ok(report)
    }

    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tracing::debug!("Sleeping {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }
}

/// Extracts one fetched page into the writer, returning its listing count
///
/// Kept synchronous so the parsed document never lives across an await.
fn extract_into(
    body: &str,
    base: &Url,
    extractor: &Extractor,
    writer: &mut ChunkedWriter,
    report: &mut TargetReport,
) -> OutputResult<usize> {
    let document = Html::parse_document(body);
    let extraction = extractor.extract(&document, base);
    let listings = extraction.listing_count();
    tracing::debug!("{} listings found", listings);

    for outcome in extraction {
        match outcome {
            Ok(record) => {
                writer.append(record)?;
                report.records += 1;
            }
            Err(e) if e.is_missing_data() => {
                tracing::debug!("Skipping {} listing: {}", extractor.kind(), e);
                report.skipped += 1;
            }
            Err(e) => {
                tracing::error!(
                    "Encountered an issue while extracting {} from {}: {}",
                    extractor.kind(),
                    base,
                    e
                );
                report.skipped += 1;
            }
        }
    }

    Ok(listings)
}
