//! Integration tests for the feed fetcher: cache, retry, and failure modes

mod common;

use std::time::{Duration, Instant};

use siphon::feed::{FeedFetcher, FetcherConfig};
use siphon::utils::error::{FetchError, ParseError};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> FetcherConfig {
    FetcherConfig {
        delay: Duration::ZERO,
        timeout: Duration::from_secs(5),
        max_attempts: 3,
        ..Default::default()
    }
}

fn rss_response() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(common::MIXED_MEDIA_RSS)
        .insert_header("Content-Type", "application/rss+xml; charset=UTF-8")
}

#[tokio::test]
async fn fetch_success_parses_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(rss_response())
        .mount(&server)
        .await;

    let fetcher = FeedFetcher::new(fast_config()).unwrap();
    let outcome = fetcher.fetch(&format!("{}/feed", server.uri())).await;

    assert!(!outcome.cached);
    let feed = outcome.feed.unwrap();
    assert_eq!(feed.title, "Example Letter");
    assert_eq!(feed.items.len(), 2);
}

#[tokio::test]
async fn second_fetch_within_ttl_hits_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(rss_response())
        .expect(1) // exactly one network request for two fetch calls
        .mount(&server)
        .await;

    let fetcher = FeedFetcher::new(fast_config()).unwrap();
    let url = format!("{}/feed", server.uri());

    let first = fetcher.fetch(&url).await;
    assert!(!first.cached);
    assert!(first.is_success());

    let second = fetcher.fetch(&url).await;
    assert!(second.cached);
    assert!(second.is_success());
    assert_eq!(second.feed.unwrap().title, "Example Letter");
}

#[tokio::test]
async fn expired_cache_refetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(rss_response())
        .expect(2)
        .mount(&server)
        .await;

    let config = FetcherConfig {
        cache_ttl: Duration::ZERO,
        ..fast_config()
    };
    let fetcher = FeedFetcher::new(config).unwrap();
    let url = format!("{}/feed", server.uri());

    assert!(!fetcher.fetch(&url).await.cached);
    assert!(!fetcher.fetch(&url).await.cached);
}

#[tokio::test]
async fn http_404_is_never_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1) // a client error aborts immediately
        .mount(&server)
        .await;

    let fetcher = FeedFetcher::new(fast_config()).unwrap();
    let outcome = fetcher.fetch(&format!("{}/feed", server.uri())).await;

    match outcome.feed.unwrap_err() {
        FetchError::ClientStatus(404) => {}
        e => panic!("expected ClientStatus(404), got {e:?}"),
    }
}

#[tokio::test]
async fn http_500_retries_then_succeeds_with_increasing_waits() {
    use wiremock::matchers::any;

    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(any())
        .respond_with(rss_response())
        .expect(1)
        .mount(&server)
        .await;

    let config = FetcherConfig {
        delay: Duration::from_millis(50),
        ..fast_config()
    };
    let fetcher = FeedFetcher::new(config).unwrap();

    let started = Instant::now();
    let outcome = fetcher.fetch(&format!("{}/feed", server.uri())).await;
    let elapsed = started.elapsed();

    assert!(outcome.is_success());
    // linear backoff: 50ms after attempt 1, 100ms after attempt 2
    assert!(
        elapsed >= Duration::from_millis(150),
        "expected at least 150ms of backoff, got {elapsed:?}"
    );
}

#[tokio::test]
async fn http_500_exhausts_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3) // max_attempts
        .mount(&server)
        .await;

    let config = FetcherConfig {
        delay: Duration::from_millis(1),
        ..fast_config()
    };
    let fetcher = FeedFetcher::new(config).unwrap();
    let outcome = fetcher.fetch(&format!("{}/feed", server.uri())).await;

    match outcome.feed.unwrap_err() {
        FetchError::ServerStatus(500) => {}
        e => panic!("expected ServerStatus(500), got {e:?}"),
    }
}

#[tokio::test]
async fn malformed_xml_is_retried_like_a_server_error() {
    use wiremock::matchers::any;

    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_string("<rss><channel><item>"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(any())
        .respond_with(rss_response())
        .expect(1)
        .mount(&server)
        .await;

    let config = FetcherConfig {
        delay: Duration::from_millis(1),
        ..fast_config()
    };
    let fetcher = FeedFetcher::new(config).unwrap();
    let outcome = fetcher.fetch(&format!("{}/feed", server.uri())).await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn unrecognized_root_fails_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>hi</body></html>"))
        .expect(1) // a format error is structural, not transient
        .mount(&server)
        .await;

    let fetcher = FeedFetcher::new(fast_config()).unwrap();
    let outcome = fetcher.fetch(&format!("{}/feed", server.uri())).await;

    match outcome.feed.unwrap_err() {
        FetchError::Parse(ParseError::UnrecognizedRoot(root)) => assert_eq!(root, "html"),
        e => panic!("expected UnrecognizedRoot, got {e:?}"),
    }
}

#[tokio::test]
async fn failed_fetches_are_not_cached() {
    use wiremock::matchers::any;

    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(any())
        .respond_with(rss_response())
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = FeedFetcher::new(fast_config()).unwrap();
    let url = format!("{}/feed", server.uri());

    assert!(!fetcher.fetch(&url).await.is_success());
    // the failure did not poison the cache; the retryable next call succeeds
    let outcome = fetcher.fetch(&url).await;
    assert!(!outcome.cached);
    assert!(outcome.is_success());
}
