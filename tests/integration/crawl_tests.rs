//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use psych::config::{CrawlerConfig, ExtractionRules};
use psych::crawler::{Coordinator, CrawlReport};
use psych::{dedup_records, PsychError};
use std::collections::BTreeSet;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a crawler configuration pointed at a local mock server
fn test_config(cache_dir: Option<&TempDir>) -> CrawlerConfig {
    CrawlerConfig {
        cache_dir: cache_dir.map(|dir| dir.path().join("cache")),
        max_parallelism: 2,
        request_delay: 100,
        queue_capacity: 100,
        request_timeout: 5,
        allowed_domains: vec!["127.0.0.1".to_string()],
        user_agent: "psych-test/1.0".to_string(),
    }
}

/// Renders a results page with one row per title and the given pagination hrefs
fn listing_page(titles: &[&str], pages: &[&str]) -> String {
    let rows: String = titles
        .iter()
        .map(|title| {
            format!(
                r#"<div class="results-row">
                     <div class="results-row-info">
                       <a href="/profile/{slug}"><div class="profile-title">{title}</div></a>
                       <div class="profile-subtitle-credentials">LMHC</div>
                     </div>
                     <div class="profile-location">Seattle, WA</div>
                     <div class="profile-features"><span class="accepting-appointments">Accepting New Clients</span></div>
                     <div class="results-row-contact"><span class="results-row-mob">(206) 555-0100</span></div>
                   </div>"#,
                slug = title.to_lowercase().replace(' ', "-"),
                title = title
            )
        })
        .collect();
    let links: String = pages
        .iter()
        .map(|href| format!(r#"<a href="{}">next</a>"#, href))
        .collect();

    format!(
        r#"<html><body>{}<div class="pagination">{}</div></body></html>"#,
        rows, links
    )
}

async fn mount_page(server: &MockServer, page: &str, body: String, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .expect(expected_hits)
        .mount(server)
        .await;
}

/// Three pages that link forwards and backwards to each other
async fn mount_three_pages(server: &MockServer, expected_hits: u64) {
    mount_page(
        server,
        "/list/1",
        listing_page(&["Alice Adams", "Bob Brown"], &["/list/1", "/list/2"]),
        expected_hits,
    )
    .await;
    mount_page(
        server,
        "/list/2",
        listing_page(&["Carol Clark", "Dan Davis"], &["/list/1", "/list/3"]),
        expected_hits,
    )
    .await;
    mount_page(
        server,
        "/list/3",
        listing_page(&["Eve Evans", "Bob Brown"], &["/list/2"]),
        expected_hits,
    )
    .await;
}

async fn run(config: CrawlerConfig, seed: &str) -> psych::Result<CrawlReport> {
    let coordinator = Coordinator::new(config, &ExtractionRules::default())?;
    coordinator.run(seed, CancellationToken::new()).await
}

fn titles(report: &CrawlReport) -> BTreeSet<String> {
    report.records.iter().map(|r| r.title.clone()).collect()
}

#[tokio::test]
async fn test_crawl_follows_pagination() {
    let server = MockServer::start().await;
    mount_three_pages(&server, 1).await;

    let report = run(test_config(None), &format!("{}/list/1", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.stats.pages_fetched, 3);
    assert_eq!(report.stats.failed_pages, 0);
    assert!(!report.stats.cancelled);

    // Every row of every page is accumulated, duplicates included
    assert_eq!(report.records.len(), 6);
    assert_eq!(report.stats.records_extracted, 6);

    let unique = dedup_records(report.records.clone());
    assert_eq!(unique.len(), 5);

    let alice = unique.iter().find(|r| r.title == "Alice Adams").unwrap();
    assert_eq!(alice.credentials, "LMHC");
    assert_eq!(alice.location, "Seattle, WA");
    assert_eq!(alice.phone, "(206) 555-0100");
    assert!(alice.is_accepting());
    assert_eq!(alice.link, format!("{}/profile/alice-adams", server.uri()));
}

#[tokio::test]
async fn test_visited_pages_are_not_refetched() {
    let server = MockServer::start().await;
    // `.expect(1)` fails the test on drop if any page is requested twice
    mount_three_pages(&server, 1).await;

    let report = run(test_config(None), &format!("{}/list/1", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.stats.pages_fetched, 3);
    let requests: u64 = report.stats.requests_per_domain.values().sum();
    assert_eq!(requests, 3);
    assert_eq!(report.stats.requests_per_domain.get("127.0.0.1"), Some(&3));
}

#[tokio::test]
async fn test_equivalent_urls_are_deduplicated() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/list/1",
        listing_page(
            &["Alice Adams"],
            &["/list/2", "/list/2/", "/list/./2#top", "/list/2?utm_source=x"],
        ),
        1,
    )
    .await;
    mount_page(&server, "/list/2", listing_page(&["Bob Brown"], &[]), 1).await;

    let report = run(test_config(None), &format!("{}/list/1", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.stats.pages_fetched, 2);
    assert_eq!(titles(&report).len(), 2);
}

#[tokio::test]
async fn test_crawl_without_pagination_terminates() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/only",
        listing_page(&["Solo Practitioner"], &[]),
        1,
    )
    .await;

    let report = tokio::time::timeout(
        Duration::from_secs(10),
        run(test_config(None), &format!("{}/only", server.uri())),
    )
    .await
    .expect("crawl did not terminate")
    .unwrap();

    assert_eq!(report.stats.pages_fetched, 1);
    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn test_failing_page_does_not_abort_crawl() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/list/1",
        listing_page(&["Alice Adams"], &["/broken", "/list/2"]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/list/2", listing_page(&["Bob Brown"], &[]), 1).await;

    let report = run(test_config(None), &format!("{}/list/1", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.stats.failed_pages, 1);
    assert_eq!(report.stats.pages_fetched, 2);
    assert_eq!(
        titles(&report),
        BTreeSet::from(["Alice Adams".to_string(), "Bob Brown".to_string()])
    );
}

#[tokio::test]
async fn test_parallel_workers_lose_no_records() {
    let server = MockServer::start().await;

    let hrefs: Vec<String> = (1..=6).map(|n| format!("/page/{}", n)).collect();
    let href_refs: Vec<&str> = hrefs.iter().map(String::as_str).collect();
    mount_page(&server, "/start", listing_page(&[], &href_refs), 1).await;

    let mut expected = 0;
    for n in 1..=6 {
        let names: Vec<String> = (0..n).map(|i| format!("Therapist {}-{}", n, i)).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        expected += names.len();
        mount_page(&server, &format!("/page/{}", n), listing_page(&name_refs, &[]), 1).await;
    }

    let config = CrawlerConfig {
        max_parallelism: 4,
        ..test_config(None)
    };
    let report = run(config, &format!("{}/start", server.uri())).await.unwrap();

    assert_eq!(report.stats.pages_fetched, 7);
    assert_eq!(report.records.len(), expected);
    assert_eq!(titles(&report).len(), expected);
}

#[tokio::test]
async fn test_requests_are_spaced_per_domain() {
    let server = MockServer::start().await;
    mount_three_pages(&server, 1).await;

    let started = std::time::Instant::now();
    run(test_config(None), &format!("{}/list/1", server.uri()))
        .await
        .unwrap();

    // Three requests to one domain need at least two delay intervals
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let server = MockServer::start().await;
    // Each page may hit the network once across both runs
    mount_three_pages(&server, 1).await;
    let cache = TempDir::new().unwrap();
    let seed = format!("{}/list/1", server.uri());

    let first = run(test_config(Some(&cache)), &seed).await.unwrap();
    assert_eq!(first.stats.pages_fetched, 3);
    assert_eq!(first.stats.cache_hits, 0);

    let second = run(test_config(Some(&cache)), &seed).await.unwrap();
    assert_eq!(second.stats.pages_fetched, 0);
    assert_eq!(second.stats.cache_hits, 3);
    assert!(second.stats.requests_per_domain.values().all(|&n| n == 0));

    assert_eq!(titles(&first), titles(&second));
    assert_eq!(
        dedup_records(first.records.clone()).len(),
        dedup_records(second.records.clone()).len()
    );
}

#[tokio::test]
async fn test_failed_pages_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    let cache = TempDir::new().unwrap();
    let seed = format!("{}/flaky", server.uri());

    for _ in 0..2 {
        let report = run(test_config(Some(&cache)), &seed).await.unwrap();
        assert_eq!(report.stats.failed_pages, 1);
        assert_eq!(report.stats.cache_hits, 0);
    }
}

#[tokio::test]
async fn test_queue_overflow_is_fatal() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/start",
        listing_page(&["Alice Adams"], &["/a", "/b", "/c"]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[], &[])))
        .mount(&server)
        .await;

    let config = CrawlerConfig {
        queue_capacity: 1,
        ..test_config(None)
    };
    let result = run(config, &format!("{}/start", server.uri())).await;

    assert!(matches!(
        result,
        Err(PsychError::QueueOverflow { capacity: 1 })
    ));
}

#[tokio::test]
async fn test_cancellation_keeps_partial_results() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/start",
        listing_page(&["Alice Adams"], &["/slow"]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&["Never Seen"], &[]))
                .set_delay(Duration::from_secs(4)),
        )
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(test_config(None), &ExtractionRules::default()).unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(800)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let report = coordinator
        .run(&format!("{}/start", server.uri()), cancel)
        .await
        .unwrap();

    assert!(report.stats.cancelled);
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(
        titles(&report),
        BTreeSet::from(["Alice Adams".to_string()])
    );
}

#[tokio::test]
async fn test_seed_outside_allowed_domains_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = CrawlerConfig {
        allowed_domains: vec!["www.psychologytoday.com".to_string()],
        ..test_config(None)
    };
    let result = run(config, &format!("{}/start", server.uri())).await;

    assert!(matches!(
        result,
        Err(PsychError::Config(psych::ConfigError::SeedNotAllowed(_)))
    ));
}

#[tokio::test]
async fn test_links_outside_allowed_domains_are_skipped() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/start",
        listing_page(
            &["Alice Adams"],
            &["https://elsewhere.example/list", "mailto:someone@example.com"],
        ),
        1,
    )
    .await;

    let report = run(test_config(None), &format!("{}/start", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.stats.pages_fetched, 1);
    assert!(report.stats.skipped_links >= 1);
}

#[tokio::test]
async fn test_warm_cache_runs_are_deterministic() {
    let server = MockServer::start().await;
    mount_three_pages(&server, 1).await;
    let cache = TempDir::new().unwrap();
    let seed = format!("{}/list/1", server.uri());

    run(test_config(Some(&cache)), &seed).await.unwrap();

    let mut sets = Vec::new();
    for parallelism in [1, 3] {
        let config = CrawlerConfig {
            max_parallelism: parallelism,
            ..test_config(Some(&cache))
        };
        let report = run(config, &seed).await.unwrap();
        let mut unique = dedup_records(report.records);
        unique.sort_by(|a, b| a.title.cmp(&b.title));
        sets.push(unique);
    }

    assert_eq!(sets[0], sets[1]);
}
