//! Integration tests for interrupting the binary
//!
//! These tests run the `sumi-trawl` executable against a wiremock site and
//! send it SIGINT in the middle of a paginated scrape.

#![cfg(unix)]

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use sumi_trawl::output::{find_batches, read_batches};
use sumi_trawl::records::JobLink;
use tempfile::TempDir;
use tokio::process::Command;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/duluth/search/jjj";

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

fn result_page(start: usize, rows: usize) -> String {
    let mut body = String::from(r#"<div class="content">"#);
    for n in start..start + rows {
        body.push_str(&format!(
            r#"<p class="row"><a class="hdrlnk" href="/duluth/job/{n}.html">Job {n}</a><span class="maptag">map</span></p>"#
        ));
    }
    body.push_str("</div>");
    body
}

/// Writes a config with a throttle delay long enough to interrupt during it
fn write_config(dir: &Path, base_url: &str) -> std::path::PathBuf {
    let config = format!(
        r#"
[scraper]
page-size = 3
retry-attempts = 1
retry-delay = 0
throttle-delay = 30
request-timeout = 5

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
csv-dir = "{csv_dir}"
rows-per-file = 1000

[source]
sites-url = "{base_url}/sites"
"#,
        csv_dir = dir.join("csv").display(),
    );

    let path = dir.join("trawl.toml");
    std::fs::write(&path, config).expect("Failed to write config");
    path
}

fn trawl_command(config: &Path, kind: &str) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_sumi-trawl"));
    command
        .arg(config)
        .args(["-t", kind, "--no-input", "-q"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    command
}

async fn search_requests(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .expect("Request recording is enabled")
        .iter()
        .filter(|r| r.url.path() == SEARCH_PATH)
        .filter_map(|r| r.url.query_pairs().find(|(k, _)| k == "s").map(|(_, v)| v.into_owned()))
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_interrupt_during_throttle_saves_buffered_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sites"))
        .respond_with(html(r#"<div class="box"><a href="/duluth/">duluth</a></div>"#.to_string()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("s", "0"))
        .respond_with(html(result_page(0, 3)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("s", "3"))
        .respond_with(html(result_page(3, 1)))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(dir.path(), &server.uri());
    let csv_dir = dir.path().join("csv");

    let status = trawl_command(&config, "domains")
        .status()
        .await
        .expect("Failed to run domains stage");
    assert!(status.success());

    let mut child = trawl_command(&config, "jobs")
        .spawn()
        .expect("Failed to start jobs stage");

    // Wait for the first page, then give the binary time to buffer its rows
    let mut waited = Duration::ZERO;
    while search_requests(&server).await.is_empty() {
        assert!(waited < Duration::from_secs(15), "first search page was never requested");
        tokio::time::sleep(Duration::from_millis(50)).await;
        waited += Duration::from_millis(50);
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    let pid = child.id().expect("Child is still running");
    let killed = Command::new("kill")
        .args(["-INT", &pid.to_string()])
        .status()
        .await
        .expect("Failed to send SIGINT");
    assert!(killed.success());

    let status = tokio::time::timeout(Duration::from_secs(10), child.wait())
        .await
        .expect("Binary did not exit after SIGINT")
        .expect("Failed to wait for binary");
    assert!(!status.success());

    assert_eq!(search_requests(&server).await, vec!["0"]);

    let files = find_batches(&csv_dir, "job_links").unwrap();
    assert_eq!(files.len(), 1, "buffered job links were not saved");
    let links: Vec<JobLink> = read_batches(&files).unwrap();
    assert_eq!(links.len(), 3);
    assert!(links[2].url.ends_with("/duluth/job/2.html"));
}
