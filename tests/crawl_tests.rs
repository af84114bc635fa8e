//! Integration tests for the crawler
//!
//! These tests use wiremock to mock the aggregation site and tempfile for
//! scratch download roots, exercising full crawl cycles end-to-end.

use magpie::config::{Config, DiscoveryStrategy};
use magpie::crawler::{
    discover_posts, fetch_bytes, run_cycle, CrawlSession, PostId, Scheduler, SchedulerState,
};
use magpie::FetchError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at a mock server
fn create_test_config(base_url: &str, download_dir: &Path) -> Config {
    let mut config = Config::default();
    config.target.base_url = Url::parse(base_url).expect("mock server URL is valid");
    config.crawler.posts_per_cycle = 30;
    config.crawler.max_concurrent_fetches = 3;
    config.output.download_dir = download_dir.to_path_buf();
    config
}

fn listing_html(ids: &[u64]) -> String {
    let rows: String = ids
        .iter()
        .map(|id| format!(r#"<tr class="athing" id="{}"><td>post {}</td></tr>"#, id, id))
        .collect();
    format!("<html><body><table>{}</table></body></html>", rows)
}

fn detail_html(article_url: &str, comment_links: &[&str]) -> String {
    let comments: String = comment_links
        .iter()
        .map(|link| format!(r#"<span class="commtext c00"><a href="{}">link</a></span>"#, link))
        .collect();
    format!(
        r#"<html><body><span class="titleline"><a href="{}">Title</a></span>{}</body></html>"#,
        article_url, comments
    )
}

fn files_in(dir: &Path) -> Vec<std::path::PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

async fn mount_listing(server: &MockServer, ids: &[u64]) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(ids)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_cycle_captures_article_and_skips_failed_post() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let download_root = tempfile::tempdir().unwrap();

    mount_listing(&mock_server, &[101, 102]).await;

    // Post 101: detail page with an article link and no comment links
    Mock::given(method("GET"))
        .and(path("/item"))
        .and(query_param("id", "101"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(detail_html(&format!("{}/article1", base_url), &[])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/article1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"article-101-bytes".to_vec()))
        .mount(&mock_server)
        .await;

    // Post 102: detail fetch fails with a server error
    Mock::given(method("GET"))
        .and(path("/item"))
        .and(query_param("id", "102"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, download_root.path());
    let session = CrawlSession::new(config.crawler.max_concurrent_fetches).unwrap();

    run_cycle(&session, &config, 0).await;

    // 101 captured: exactly one file containing the mocked article bytes
    let dir_101 = download_root.path().join("101");
    let files = files_in(&dir_101);
    assert_eq!(files.len(), 1, "expected exactly one file in {:?}", dir_101);
    assert_eq!(std::fs::read(&files[0]).unwrap(), b"article-101-bytes");

    // 102 failed before the commit point: no directory, still eligible
    assert!(!download_root.path().join("102").exists());
}

#[tokio::test]
async fn test_captured_post_gets_zero_fetches() {
    let mock_server = MockServer::start().await;
    let download_root = tempfile::tempdir().unwrap();

    mount_listing(&mock_server, &[55]).await;

    // The detail page must never be requested for an already-captured post
    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html("http://x/a", &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    // Pre-populate the dedup marker from a "previous run"
    std::fs::create_dir(download_root.path().join("55")).unwrap();

    let config = create_test_config(&mock_server.uri(), download_root.path());
    let session = CrawlSession::new(3).unwrap();

    run_cycle(&session, &config, 0).await;

    // Directory untouched; wiremock verifies the expect(0) on drop
    assert!(files_in(&download_root.path().join("55")).is_empty());
}

#[tokio::test]
async fn test_failed_detail_fetch_leaves_post_eligible() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let download_root = tempfile::tempdir().unwrap();

    mount_listing(&mock_server, &[7]).await;

    Mock::given(method("GET"))
        .and(path("/article7"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"seventh".to_vec()))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, download_root.path());
    let session = CrawlSession::new(3).unwrap();

    // First cycle: the detail fetch transport-fails
    {
        let _failing = Mock::given(method("GET"))
            .and(path("/item"))
            .and(query_param("id", "7"))
            .respond_with(ResponseTemplate::new(503))
            .mount_as_scoped(&mock_server)
            .await;

        run_cycle(&session, &config, 0).await;
        assert!(
            !download_root.path().join("7").exists(),
            "failed post must not leave a directory behind"
        );
    }

    // Second cycle: the site recovered, the post is captured
    Mock::given(method("GET"))
        .and(path("/item"))
        .and(query_param("id", "7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(detail_html(&format!("{}/article7", base_url), &[])),
        )
        .mount(&mock_server)
        .await;

    run_cycle(&session, &config, 1).await;

    let files = files_in(&download_root.path().join("7"));
    assert_eq!(files.len(), 1);
    assert_eq!(std::fs::read(&files[0]).unwrap(), b"seventh");
}

#[tokio::test]
async fn test_duplicate_comment_links_download_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let download_root = tempfile::tempdir().unwrap();

    mount_listing(&mock_server, &[9]).await;

    let article = format!("{}/a", base_url);
    let link_b = format!("{}/b", base_url);
    let link_c = format!("{}/c", base_url);

    // Comment thread references B twice
    Mock::given(method("GET"))
        .and(path("/item"))
        .and(query_param("id", "9"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(
            &article,
            &[&link_b, &link_c, &link_b],
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"aaa".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"bbb".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ccc".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, download_root.path());
    let session = CrawlSession::new(3).unwrap();

    run_cycle(&session, &config, 0).await;

    // Exactly three files: A, B, C — the duplicate collapsed
    let files = files_in(&download_root.path().join("9"));
    assert_eq!(files.len(), 3);
}

#[tokio::test]
async fn test_index_discovery_truncates_to_limit() {
    let mock_server = MockServer::start().await;
    let download_root = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/v0/topstories.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[5, 6, 7, 8, 9]"))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), download_root.path());
    config.target.discovery = DiscoveryStrategy::Index;
    config.target.index_url =
        Some(Url::parse(&format!("{}/v0/topstories.json", mock_server.uri())).unwrap());
    config.crawler.posts_per_cycle = 3;

    let session = CrawlSession::new(3).unwrap();
    let ids = discover_posts(&session, &config).await.unwrap();

    assert_eq!(ids, vec![PostId::new("5"), PostId::new("6"), PostId::new("7")]);
}

#[tokio::test]
async fn test_fetch_blocks_until_budget_slot_frees() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/resource"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let session = Arc::new(CrawlSession::new(1).unwrap());

    // Hold the only budget slot
    let permit = session.acquire_fetch_slot().await.unwrap();
    assert_eq!(session.available_fetch_slots(), 0);

    let url = format!("{}/resource", mock_server.uri());
    let fetch_session = Arc::clone(&session);
    let handle = tokio::spawn(async move { fetch_bytes(&fetch_session, &url).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(
        !handle.is_finished(),
        "fetch must wait for a budget slot, not run beyond the cap"
    );

    drop(permit);

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("fetch did not finish after the slot freed")
        .unwrap();
    assert_eq!(result.unwrap().as_ref(), b"ok");
}

#[tokio::test]
async fn test_cancellation_unblocks_inflight_fetch() {
    let mock_server = MockServer::start().await;

    // Response delayed far beyond the test horizon
    Mock::given(method("GET"))
        .and(path("/hang"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&mock_server)
        .await;

    let session = Arc::new(CrawlSession::new(1).unwrap());
    let url = format!("{}/hang", mock_server.uri());
    let fetch_session = Arc::clone(&session);
    let handle = tokio::spawn(async move { fetch_bytes(&fetch_session, &url).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    session.cancel_token().cancel();

    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("cancelled fetch did not unblock promptly")
        .unwrap();
    assert!(matches!(result, Err(FetchError::Cancelled)));

    // The budget slot held by the cancelled fetch was released
    assert_eq!(session.available_fetch_slots(), 1);
}

#[tokio::test]
async fn test_scheduler_drains_to_stopped_with_inflight_work() {
    let mock_server = MockServer::start().await;
    let download_root = tempfile::tempdir().unwrap();

    mount_listing(&mock_server, &[1, 2, 3]).await;

    // Detail pages hang so the first cycle is mid-flight when we cancel
    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(detail_html("http://unused.example/", &[]))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), download_root.path());
    config.crawler.poll_period_secs = 60;

    let session = Arc::new(CrawlSession::new(2).unwrap());
    let cancel = session.cancel_token();

    let mut scheduler = Scheduler::new(Arc::new(config), Arc::clone(&session));
    let handle = tokio::spawn(async move {
        scheduler.run().await.unwrap();
        scheduler.state()
    });

    // Let the first cycle start its detail fetches, then pull the plug
    tokio::time::sleep(Duration::from_millis(300)).await;
    cancel.cancel();

    let state = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler did not drain promptly")
        .unwrap();
    assert_eq!(state, SchedulerState::Stopped);

    // Nothing was committed: every detail fetch was cancelled pre-commit
    assert!(!download_root.path().join("1").exists());
    assert!(!download_root.path().join("2").exists());
    assert!(!download_root.path().join("3").exists());
}
