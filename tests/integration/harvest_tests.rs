//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock HTTP servers and run complete
//! harvests end-to-end against them.

use favicon_harvest::config::{parse_config, Config};
use favicon_harvest::harvest::{harvest, plan_run};
use favicon_harvest::storage::{Ledger, SqliteLedger};
use favicon_harvest::{AttemptResult, AttemptStatus, HarvestError, Strategy};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ICON_BYTES: &[u8] = b"\x00\x00\x01\x00test-icon";

/// Writes the link source and builds a fast test configuration around it
fn create_test_config(
    dir: &Path,
    links: &[(&str, &str)],
    server_uri: &str,
    order: &str,
    concurrency: u32,
) -> Config {
    let entries: Vec<serde_json::Value> = links
        .iter()
        .map(|(id, url)| serde_json::json!({ "id": id, "title": format!("Site {}", id), "url": url }))
        .collect();
    let source = dir.join("links.json");
    std::fs::write(&source, serde_json::to_string(&entries).unwrap()).unwrap();

    let d = dir.display();
    let toml = format!(
        r#"
[source]
path = "{source}"

[fetcher]
max-retries = 1
base-timeout-ms = 2000
slow-timeout-ms = 2000
backoff-base-ms = 10
backoff-max-ms = 20
pacing-jitter-ms = 0
min-host-interval-ms = 0

[scheduler]
concurrency = {concurrency}

[breaker]
failure-threshold = 10
cooldown-ms = 1000

[strategy]
order = "{order}"
fallback-service = "{server_uri}/s2/favicons?domain={{host}}"

[output]
icon-dir = "{d}/icons"
report-path = "{d}/report.jsonl"
ledger-path = "{d}/ledger.db"
error-log-path = "{d}/errors.log"
"#,
        source = source.display(),
    );

    parse_config(&toml).expect("test config should be valid")
}

async fn mount_root_icon(server: &MockServer) {
    Mock::given(method("HEAD"))
        .and(path("/favicon.ico"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/x-icon"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/favicon.ico"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/x-icon")
                .set_body_bytes(ICON_BYTES.to_vec()),
        )
        .mount(server)
        .await;
}

fn read_report(dir: &Path) -> Vec<AttemptResult> {
    std::fs::read_to_string(dir.join("report.jsonl"))
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).expect("report line should be valid JSON"))
        .collect()
}

#[tokio::test]
async fn test_example_run_one_success_one_failure() {
    let server = MockServer::start().await;
    mount_root_icon(&server).await;

    let dir = TempDir::new().unwrap();
    let uri = server.uri();
    let config = create_test_config(
        dir.path(),
        &[("a", uri.as_str()), ("b", "https://bad.invalid")],
        &uri,
        "root-first",
        2,
    );

    let summary = harvest(config, "test-hash", false).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 0);

    let mut report = read_report(dir.path());
    report.sort_by(|x, y| x.target_id.cmp(&y.target_id));
    assert_eq!(report.len(), 2);

    let a = &report[0];
    assert_eq!(a.status, AttemptStatus::Success);
    assert_eq!(a.strategy, Strategy::Root);
    assert_eq!(a.byte_length, Some(ICON_BYTES.len() as u64));

    let b = &report[1];
    assert_eq!(b.status, AttemptStatus::Failed);
    assert!(b.error.is_some());

    let icon = dir.path().join("icons").join("127.0.0.1.ico");
    assert_eq!(std::fs::read(icon).unwrap(), ICON_BYTES);

    let errors = std::fs::read_to_string(dir.path().join("errors.log")).unwrap();
    assert_eq!(errors.lines().count(), 1);
    assert!(errors.contains("bad.invalid"));

    let ledger = SqliteLedger::new(&dir.path().join("ledger.db")).unwrap();
    let run = ledger.get_latest_run().unwrap().unwrap();
    assert_eq!(run.config_hash, "test-hash");
    assert!(run.finished_at.is_some());
    assert_eq!(
        ledger.last_status("b").unwrap(),
        Some(AttemptStatus::Failed)
    );
}

#[tokio::test]
async fn test_resume_is_idempotent() {
    let server = MockServer::start().await;
    mount_root_icon(&server).await;

    let dir = TempDir::new().unwrap();
    let uri = server.uri();
    let links = [("a", uri.as_str())];

    let first = harvest(
        create_test_config(dir.path(), &links, &uri, "root-first", 1),
        "h",
        false,
    )
    .await
    .unwrap();
    assert_eq!(first.succeeded, 1);

    let requests_after_first = server.received_requests().await.unwrap().len();
    let report_after_first = std::fs::read_to_string(dir.path().join("report.jsonl")).unwrap();
    let icon_path = dir.path().join("icons").join("127.0.0.1.ico");
    let icon_after_first = std::fs::read(&icon_path).unwrap();

    let second = harvest(
        create_test_config(dir.path(), &links, &uri, "root-first", 1),
        "h",
        false,
    )
    .await
    .unwrap();

    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_after_first
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("report.jsonl")).unwrap(),
        report_after_first
    );
    assert_eq!(std::fs::read(&icon_path).unwrap(), icon_after_first);
}

#[tokio::test]
async fn test_fresh_run_ignores_earlier_success() {
    let server = MockServer::start().await;
    mount_root_icon(&server).await;

    let dir = TempDir::new().unwrap();
    let uri = server.uri();
    let links = [("a", uri.as_str())];

    harvest(
        create_test_config(dir.path(), &links, &uri, "root-first", 1),
        "h",
        false,
    )
    .await
    .unwrap();

    let fresh = harvest(
        create_test_config(dir.path(), &links, &uri, "root-first", 1),
        "h",
        true,
    )
    .await
    .unwrap();

    assert_eq!(fresh.processed, 1);
    assert_eq!(fresh.skipped, 0);
    assert_eq!(read_report(dir.path()).len(), 2);
}

#[tokio::test]
async fn test_failed_target_retried_on_resume() {
    let server = MockServer::start().await;

    let dir = TempDir::new().unwrap();
    let uri = server.uri();
    let links = [("a", uri.as_str())];

    // No mocks yet: every strategy 404s and the fallback download 404s too
    let first = harvest(
        create_test_config(dir.path(), &links, &uri, "root-first", 1),
        "h",
        false,
    )
    .await
    .unwrap();
    assert_eq!(first.failed, 1);

    mount_root_icon(&server).await;

    let second = harvest(
        create_test_config(dir.path(), &links, &uri, "root-first", 1),
        "h",
        false,
    )
    .await
    .unwrap();
    assert_eq!(second.skipped, 0);
    assert_eq!(second.succeeded, 1);

    let ledger = SqliteLedger::new(&dir.path().join("ledger.db")).unwrap();
    assert_eq!(
        ledger.last_status("a").unwrap(),
        Some(AttemptStatus::Success)
    );
}

#[tokio::test]
async fn test_duplicate_icons_detected() {
    let server = MockServer::start().await;
    mount_root_icon(&server).await;

    let port = url::Url::parse(&server.uri()).unwrap().port().unwrap();
    let by_ip = format!("http://127.0.0.1:{}", port);
    let by_name = format!("http://localhost:{}", port);

    let dir = TempDir::new().unwrap();
    let config = create_test_config(
        dir.path(),
        &[("a", by_ip.as_str()), ("c", by_name.as_str())],
        &server.uri(),
        "root-first",
        1,
    );

    let summary = harvest(config, "h", false).await.unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.unique_hashes, 1);
    assert_eq!(summary.duplicate_groups.len(), 1);
    assert_eq!(
        summary.duplicate_groups[0].1,
        vec!["a".to_string(), "c".to_string()]
    );

    let icons = dir.path().join("icons");
    assert!(icons.join("127.0.0.1.ico").exists());
    assert!(icons.join("localhost.ico").exists());

    let mut report = read_report(dir.path());
    report.sort_by(|x, y| x.target_id.cmp(&y.target_id));
    assert_eq!(report[0].content_hash, report[1].content_hash);
    assert_eq!(report[0].duplicate_of, None);
    assert_eq!(report[1].duplicate_of.as_deref(), Some("a"));
}

#[tokio::test]
async fn test_html_first_uses_declared_icon() {
    let server = MockServer::start().await;
    mount_root_icon(&server).await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><head><link rel="icon" type="image/png" href="/brand.png"></head></html>"#,
            "text/html",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/brand.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(b"\x89PNG\r\n".to_vec()),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uri = server.uri();
    let config = create_test_config(dir.path(), &[("a", uri.as_str())], &uri, "html-first", 1);

    let summary = harvest(config, "h", false).await.unwrap();
    assert_eq!(summary.succeeded, 1);

    let report = read_report(dir.path());
    assert_eq!(report[0].strategy, Strategy::HtmlParsed);
    assert!(report[0].icon_url.as_deref().unwrap().ends_with("/brand.png"));
    assert!(dir.path().join("icons").join("127.0.0.1.png").exists());
}

#[tokio::test]
async fn test_fallback_service_used_last() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html><head></head></html>", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/s2/favicons"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(b"\x89PNG-fallback".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uri = server.uri();
    let config = create_test_config(dir.path(), &[("a", uri.as_str())], &uri, "root-first", 1);

    let summary = harvest(config, "h", false).await.unwrap();
    assert_eq!(summary.succeeded, 1);

    let report = read_report(dir.path());
    assert_eq!(report[0].strategy, Strategy::SearchEngineFallback);
}

#[tokio::test]
async fn test_unreadable_source_aborts() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path(), &[], "http://127.0.0.1:9", "root-first", 1);
    config.source.path = dir.path().join("missing.json").display().to_string();

    let result = harvest(config, "h", false).await;

    assert!(matches!(result, Err(HarvestError::Source(_))));
    assert!(!dir.path().join("ledger.db").exists());
}

#[tokio::test]
async fn test_plan_run_reports_skips_without_network() {
    let server = MockServer::start().await;
    mount_root_icon(&server).await;

    let dir = TempDir::new().unwrap();
    let uri = server.uri();
    let links = [("a", uri.as_str()), ("z", "https://bad.invalid")];

    let config = create_test_config(dir.path(), &links[..1], &uri, "root-first", 1);
    harvest(config, "h", false).await.unwrap();

    let config = create_test_config(dir.path(), &links, &uri, "root-first", 1);
    let requests_before = server.received_requests().await.unwrap().len();
    let plan = plan_run(&config, false).unwrap();

    assert_eq!(plan.skipped.len(), 1);
    assert_eq!(plan.skipped[0].id, "a");
    assert_eq!(plan.queued.len(), 1);
    assert_eq!(plan.queued[0].id, "z");
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_before
    );
}

#[tokio::test]
async fn test_unwritable_report_leaves_no_run_record() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(
        dir.path(),
        &[("a", "http://127.0.0.1:9")],
        "http://127.0.0.1:9",
        "root-first",
        1,
    );
    let report_dir = dir.path().join("report-dir");
    std::fs::create_dir_all(&report_dir).unwrap();
    config.output.report_path = report_dir.display().to_string();

    let result = harvest(config, "h", false).await;
    assert!(result.is_err());

    let ledger = SqliteLedger::new(&dir.path().join("ledger.db")).unwrap();
    assert!(ledger.get_latest_run().unwrap().is_none());
}
