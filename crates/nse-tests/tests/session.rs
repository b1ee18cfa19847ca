//! Session bootstrap tests.

use futures_util::future::join_all;
use nse_client::{NseClient, RetryPolicy};
use nse_tests::{
    FakeUpstream, MARKET_STATUS, Reply, SESSION_COOKIE, client_config, create_test_client,
    unique_path,
};
use serde_json::json;
use std::time::Duration;

async fn start() -> FakeUpstream {
    FakeUpstream::start().await.expect("Failed to start fake upstream")
}

#[tokio::test]
async fn test_client_is_lazy() {
    let upstream = start().await;
    let client = create_test_client(&upstream).expect("Failed to create client");

    assert!(!client.is_bootstrapped());
    assert_eq!(client.session().generation(), 0);
    assert_eq!(upstream.home_hits(), 0);
}

#[tokio::test]
async fn test_bootstrap_is_idempotent() {
    let upstream = start().await;
    let client = create_test_client(&upstream).expect("Failed to create client");

    assert!(client.bootstrap().await);
    assert!(client.bootstrap().await);

    assert!(client.is_bootstrapped());
    assert_eq!(client.session().generation(), 1);
    assert_eq!(upstream.home_hits(), 2);
}

#[tokio::test]
async fn test_first_request_bootstraps_once() {
    let upstream = start().await;
    upstream.set_default(MARKET_STATUS, Reply::json(json!({"marketState": []})));
    let client = create_test_client(&upstream).expect("Failed to create client");

    client.market_status().await.expect("First call failed");
    client.market_status().await.expect("Second call failed");

    assert_eq!(upstream.home_hits(), 1);
    assert_eq!(upstream.api_hits(MARKET_STATUS), 2);
    assert_eq!(client.session().generation(), 1);
}

#[tokio::test]
async fn test_session_cookie_is_sent() {
    let upstream = start().await;
    upstream
        .require_cookie(true)
        .set_default(MARKET_STATUS, Reply::json(json!({"marketState": []})));
    let client = create_test_client(&upstream).expect("Failed to create client");

    client.market_status().await.expect("Request failed");

    let cookie = upstream.last_cookie().expect("No cookie header");
    assert!(cookie.contains(&format!("{SESSION_COOKIE}=session-1")), "{cookie}");
    assert!(cookie.contains("bm_sv=fake"), "{cookie}");
}

#[tokio::test]
async fn test_concurrent_requests_share_one_bootstrap() {
    let upstream = start().await;
    upstream
        .set_home_delay(Duration::from_millis(200))
        .set_default(MARKET_STATUS, Reply::json(json!({"marketState": []})));
    let client = create_test_client(&upstream).expect("Failed to create client");

    let calls = (0..8).map(|_| {
        let client = client.clone();
        async move { client.market_status().await }
    });
    let results = join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(upstream.home_hits(), 1);
    assert_eq!(upstream.api_hits(MARKET_STATUS), 8);
    assert_eq!(client.session().generation(), 1);
}

#[tokio::test]
async fn test_rejected_bootstrap_leaves_session_empty() {
    let upstream = start().await;
    upstream.set_home_status(503);
    let client = create_test_client(&upstream).expect("Failed to create client");

    assert!(!client.bootstrap().await);
    assert!(!client.is_bootstrapped());
    assert_eq!(client.session().generation(), 0);
}

#[tokio::test]
async fn test_failed_reverify_keeps_existing_session() {
    let upstream = start().await;
    let client = create_test_client(&upstream).expect("Failed to create client");
    assert!(client.bootstrap().await);

    upstream.set_home_status(503);
    assert!(!client.bootstrap().await);

    assert!(client.is_bootstrapped());
    assert_eq!(client.session().generation(), 1);
}

#[tokio::test]
async fn test_request_proceeds_without_session() {
    let upstream = start().await;
    upstream
        .set_home_status(503)
        .set_default(MARKET_STATUS, Reply::json(json!({"marketState": []})));
    let client = create_test_client(&upstream).expect("Failed to create client");

    let body = client.market_status().await.expect("Request failed");

    assert_eq!(body, json!({"marketState": []}));
    assert!(!client.is_bootstrapped());
}

// ============================================================================
// Cookie cache
// ============================================================================

#[tokio::test]
async fn test_cookie_cache_round_trip() {
    let upstream = start().await;
    upstream
        .require_cookie(true)
        .set_default(MARKET_STATUS, Reply::json(json!({"marketState": []})));
    let path = unique_path("nse_cookie_cache");

    let mut config = client_config(&upstream, RetryPolicy::default());
    config.cookie_cache = Some(path.clone());

    let first = NseClient::new(config.clone()).expect("Failed to create client");
    assert!(!first.is_bootstrapped());
    first.market_status().await.expect("First client failed");
    assert_eq!(upstream.home_hits(), 1);
    assert!(path.exists());

    let second = NseClient::new(config).expect("Failed to create client");
    assert!(second.is_bootstrapped());
    second.market_status().await.expect("Second client failed");

    assert_eq!(upstream.home_hits(), 1);
    let cookie = upstream.last_cookie().expect("No cookie header");
    assert!(cookie.contains(&format!("{SESSION_COOKIE}=session-1")), "{cookie}");

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[tokio::test]
async fn test_corrupt_cookie_cache_is_ignored() {
    let upstream = start().await;
    let path = unique_path("nse_cookie_corrupt");
    let dir = path.parent().expect("Cache path has a parent");
    std::fs::create_dir_all(dir).expect("Failed to create cache dir");
    std::fs::write(&path, "not json").expect("Failed to write cache");

    let mut config = client_config(&upstream, RetryPolicy::default());
    config.cookie_cache = Some(path.clone());
    let client = NseClient::new(config).expect("Failed to create client");

    assert!(!client.is_bootstrapped());
    assert!(client.bootstrap().await);
    assert!(std::fs::read_to_string(&path)
        .expect("Cache not rewritten")
        .contains("session-1"));

    let _ = std::fs::remove_dir_all(dir);
}
