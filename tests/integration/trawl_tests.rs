//! Integration tests for the scrape stages
//!
//! These tests use wiremock to stand in for a listing site and run the
//! domains, jobs and details stages end-to-end against it.

use indexmap::IndexMap;
use std::path::Path;
use sumi_trawl::config::{Config, OutputConfig, ScraperConfig, SourceConfig, UserAgentConfig};
use sumi_trawl::crawler::{build_http_client, HttpFetcher, RunOutcome, ScrapeKind, Trawler};
use sumi_trawl::output::{find_batches, read_batches, OverwritePolicy, RunGuard};
use sumi_trawl::records::{JobDetail, JobLink};
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, csv_dir: &Path, page_size: u32, rows_per_file: usize) -> Config {
    let mut search_params = IndexMap::new();
    search_params.insert("employment_type".to_string(), "1".to_string());

    Config {
        scraper: ScraperConfig {
            page_size,
            retry_attempts: 5,
            retry_delay: 0, // No waiting in tests
            throttle_delay: 0,
            request_timeout: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            csv_dir: csv_dir.to_string_lossy().into_owned(),
            rows_per_file,
        },
        source: SourceConfig {
            sites_url: format!("{}/sites", base_url),
            search_path: "search/jjj".to_string(),
            offset_param: "s".to_string(),
            search_params,
        },
    }
}

fn trawler(config: &Config, policy: OverwritePolicy) -> Trawler<HttpFetcher> {
    let client = build_http_client(&config.user_agent, &config.scraper).expect("Failed to build client");
    Trawler::from_config(HttpFetcher::new(client), config, RunGuard::new(policy))
        .expect("Failed to build trawler")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

fn sites_page() -> String {
    r#"<div class="box">
        <a href="/duluth/">duluth</a>
        <a href="/fargo/">fargo</a>
    </div>"#
        .to_string()
}

/// A result page with `rows` job rows starting at `start`, all with map tags
fn result_page(site: &str, start: usize, rows: usize) -> String {
    let mut body = String::from(r#"<div class="content">"#);
    for n in start..start + rows {
        body.push_str(&format!(
            r#"<p class="row"><a class="hdrlnk" href="/{site}/job/{n}.html">Job {n}</a><span class="maptag">map</span></p>"#
        ));
    }
    body.push_str("</div>");
    body
}

fn detail_page() -> String {
    r#"<span id="titletextonly">Line Cook</span>
       <div id="map" data-latitude="46.78" data-longitude="-92.10"></div>"#
        .to_string()
}

/// Mounts the sites index, paginated searches and job detail pages
async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/sites"))
        .respond_with(html(&sites_page()))
        .mount(server)
        .await;

    // duluth: 3 + 3 + 1 results with a page size of 3
    for (offset, rows) in [("0", 3), ("3", 3), ("6", 1)] {
        let start: usize = offset.parse().unwrap();
        Mock::given(method("GET"))
            .and(path("/duluth/search/jjj"))
            .and(query_param("s", offset))
            .and(query_param("employment_type", "1"))
            .respond_with(html(&result_page("duluth", start, rows)))
            .mount(server)
            .await;
    }

    // fargo: a single short page
    Mock::given(method("GET"))
        .and(path("/fargo/search/jjj"))
        .and(query_param("s", "0"))
        .respond_with(html(&result_page("fargo", 0, 2)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/(duluth|fargo)/job/\d+\.html$"))
        .respond_with(html(&detail_page()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_trawl_all_stages() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    let config = create_test_config(&server.uri(), dir.path(), 3, 4);
    let stats = trawler(&config, OverwritePolicy::Decline)
        .run(&ScrapeKind::all())
        .await;

    // 1 domains run, 2 job link runs, 1 details run
    assert_eq!(stats.runs_completed, 4);
    assert!(!stats.has_failures());

    let links: Vec<JobLink> =
        read_batches(&find_batches(dir.path(), "job_links").unwrap()).unwrap();
    assert_eq!(links.len(), 9);

    let duluth: Vec<&JobLink> = links.iter().filter(|l| l.url.contains("/duluth/")).collect();
    assert_eq!(duluth.len(), 7);
    assert!(duluth[0].url.ends_with("/duluth/job/0.html"));
    assert!(duluth[6].url.ends_with("/duluth/job/6.html"));

    let detail_files = find_batches(dir.path(), "job_details").unwrap();
    assert_eq!(detail_files.len(), 3); // 9 rows at 4 per file
    let details: Vec<JobDetail> = read_batches(&detail_files).unwrap();
    assert_eq!(details.len(), 9);
    assert_eq!(details[0].title, "Line Cook");
    assert_eq!(details[0].latitude, 46.78);
}

#[tokio::test]
async fn test_pagination_offsets_requested_in_order() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    let config = create_test_config(&server.uri(), dir.path(), 3, 1000);
    let trawler = trawler(&config, OverwritePolicy::Decline);
    trawler.scrape_domains().await;
    let outcomes = trawler.scrape_jobs().await;
    assert_eq!(outcomes.len(), 2);

    let offsets: Vec<String> = server
        .received_requests()
        .await
        .expect("Request recording is enabled")
        .iter()
        .filter(|r| r.url.path() == "/duluth/search/jjj")
        .filter_map(|r| r.url.query_pairs().find(|(k, _)| k == "s").map(|(_, v)| v.into_owned()))
        .collect();
    assert_eq!(offsets, vec!["0", "3", "6"]);
}

#[tokio::test]
async fn test_rerun_is_skipped_without_fetching() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    let config = create_test_config(&server.uri(), dir.path(), 3, 1000);
    trawler(&config, OverwritePolicy::Decline)
        .run(&ScrapeKind::all())
        .await;

    let requests_before = server.received_requests().await.unwrap().len();
    let files_before = std::fs::read_dir(dir.path()).unwrap().count();

    let stats = trawler(&config, OverwritePolicy::Decline)
        .run(&ScrapeKind::all())
        .await;

    assert_eq!(stats.runs_skipped, 4);
    assert_eq!(stats.runs_completed, 0);
    assert_eq!(server.received_requests().await.unwrap().len(), requests_before);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), files_before);
}

#[tokio::test]
async fn test_approved_rerun_appends_new_batches() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    let config = create_test_config(&server.uri(), dir.path(), 3, 1000);
    trawler(&config, OverwritePolicy::Decline)
        .run(&[ScrapeKind::Domains])
        .await;
    let original = std::fs::read_to_string(dir.path().join("domains.csv")).unwrap();

    let stats = trawler(&config, OverwritePolicy::Approve)
        .run(&[ScrapeKind::Domains])
        .await;

    assert_eq!(stats.runs_completed, 1);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("domains.csv")).unwrap(),
        original
    );
    assert!(dir.path().join("domains1.csv").exists());
}

#[tokio::test]
async fn test_transient_server_errors_are_retried() {
    let server = MockServer::start().await;

    // Two failures first, then the real page
    Mock::given(method("GET"))
        .and(path("/sites"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sites"))
        .respond_with(html(&sites_page()))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&server.uri(), dir.path(), 3, 1000);

    let outcome = trawler(&config, OverwritePolicy::Decline).scrape_domains().await;

    let RunOutcome::Completed { summary, targets } = outcome else {
        panic!("domains run did not complete");
    };
    assert_eq!(summary.rows, 2);
    assert!(!targets[0].is_failed());
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_persistent_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sites"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&server.uri(), dir.path(), 3, 1000);

    let stats = trawler(&config, OverwritePolicy::Decline)
        .run(&[ScrapeKind::Domains, ScrapeKind::Jobs])
        .await;

    assert_eq!(stats.failed_targets, vec!["sites index".to_string()]);
    assert_eq!(stats.runs_empty, 1); // no domains, so nothing for the job stage
    assert_eq!(server.received_requests().await.unwrap().len(), 5);
    assert!(find_batches(dir.path(), "domains").unwrap().is_empty());
}
