//! Retry, auth recovery, cancellation and deadline tests.

use futures_util::future::join_all;
use nse_client::{Error, NseClient, RetryPolicy, SymbolKind};
use nse_tests::{
    FakeUpstream, MARKET_STATUS, OPTION_CHAIN_INDICES, Reply, client_config, create_test_client,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_test::assert_ok;

async fn start() -> FakeUpstream {
    FakeUpstream::start().await.expect("Failed to start fake upstream")
}

fn client_with(upstream: &FakeUpstream, retry: RetryPolicy) -> NseClient {
    NseClient::new(client_config(upstream, retry)).expect("Failed to create client")
}

// ============================================================================
// Retry bound
// ============================================================================

#[tokio::test]
async fn test_retry_bound_is_respected() {
    let upstream = start().await;
    upstream.set_default(MARKET_STATUS, Reply::status(500));
    let client = client_with(&upstream, RetryPolicy::limited(4).expect("valid policy"));

    let err = client.market_status().await.unwrap_err();

    match err {
        Error::RequestFailure {
            attempts,
            last_status,
            ..
        } => {
            assert_eq!(attempts, 4);
            assert_eq!(last_status, Some(500));
        }
        other => panic!("Expected RequestFailure, got {other:?}"),
    }
    assert_eq!(upstream.api_hits(MARKET_STATUS), 4);
}

#[tokio::test]
async fn test_single_attempt_policy_does_not_retry() {
    let upstream = start().await;
    upstream.set_default(MARKET_STATUS, Reply::status(503));
    let client = client_with(&upstream, RetryPolicy::limited(1).expect("valid policy"));

    let err = client.market_status().await.unwrap_err();

    assert_eq!(err.last_status(), Some(503));
    assert_eq!(upstream.api_hits(MARKET_STATUS), 1);
}

#[tokio::test]
async fn test_transient_failures_then_success() {
    let upstream = start().await;
    upstream
        .push(MARKET_STATUS, Reply::status(502))
        .push(MARKET_STATUS, Reply::text("<html>busy</html>"))
        .push(MARKET_STATUS, Reply::json(json!({"marketState": ["open"]})));
    let client = create_test_client(&upstream).expect("Failed to create client");

    let body = assert_ok!(client.market_status().await);

    assert_eq!(body, json!({"marketState": ["open"]}));
    assert_eq!(upstream.api_hits(MARKET_STATUS), 3);
}

#[tokio::test]
async fn test_unlimited_retries_until_success() {
    let upstream = start().await;
    for _ in 0..6 {
        upstream.push(MARKET_STATUS, Reply::status(500));
    }
    upstream.push(MARKET_STATUS, Reply::json(json!({"ok": true})));
    let client = client_with(&upstream, RetryPolicy::unlimited());

    let body = assert_ok!(client.market_status().await);

    assert_eq!(body, json!({"ok": true}));
    assert_eq!(upstream.api_hits(MARKET_STATUS), 7);
}

#[tokio::test]
async fn test_retry_interval_is_observed() {
    let upstream = start().await;
    upstream
        .push(MARKET_STATUS, Reply::status(500))
        .push(MARKET_STATUS, Reply::status(500))
        .push(MARKET_STATUS, Reply::json(json!({})));
    let policy = RetryPolicy::default();
    let mut config = client_config(&upstream, policy);
    config.retry = config.retry.with_interval(Duration::from_millis(150));
    let client = NseClient::new(config).expect("Failed to create client");

    let started = Instant::now();
    assert_ok!(client.market_status().await);

    assert!(started.elapsed() >= Duration::from_millis(300));
}

// ============================================================================
// Auth recovery
// ============================================================================

#[tokio::test]
async fn test_unauthorized_rebootstraps_once() {
    let upstream = start().await;
    upstream
        .push(OPTION_CHAIN_INDICES, Reply::status(401))
        .push(OPTION_CHAIN_INDICES, Reply::json(json!({"records": {}})));
    let client = create_test_client(&upstream).expect("Failed to create client");

    let body = assert_ok!(client.option_chain("NIFTY", SymbolKind::Index).await);

    assert_eq!(body, json!({"records": {}}));
    assert_eq!(upstream.home_hits(), 2);
    assert_eq!(upstream.api_hits(OPTION_CHAIN_INDICES), 2);
    assert_eq!(client.session().generation(), 2);
}

#[tokio::test]
async fn test_expired_session_recovers() {
    let upstream = start().await;
    upstream
        .require_cookie(true)
        .set_default(MARKET_STATUS, Reply::json(json!({"ok": true})));
    let client = create_test_client(&upstream).expect("Failed to create client");
    assert_ok!(client.market_status().await);

    upstream.expire_sessions();
    assert_ok!(client.market_status().await);

    assert_eq!(upstream.home_hits(), 2);
    let cookie = upstream.last_cookie().expect("No cookie header");
    assert!(cookie.contains("session-2"), "{cookie}");
}

#[tokio::test]
async fn test_concurrent_unauthorized_share_one_rebootstrap() {
    let upstream = start().await;
    upstream
        .require_cookie(true)
        .set_default(MARKET_STATUS, Reply::json(json!({"ok": true})));
    let client = create_test_client(&upstream).expect("Failed to create client");
    assert!(client.bootstrap().await);

    upstream.expire_sessions();
    let calls = (0..6).map(|_| {
        let client = client.clone();
        async move { client.market_status().await }
    });
    let results = join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(upstream.home_hits(), 2);
    assert_eq!(client.session().generation(), 2);
}

#[tokio::test]
async fn test_persistent_unauthorized_exhausts_retries() {
    let upstream = start().await;
    upstream.set_default(MARKET_STATUS, Reply::status(401));
    let client = client_with(&upstream, RetryPolicy::limited(3).expect("valid policy"));

    let err = client.market_status().await.unwrap_err();

    match err {
        Error::RequestFailure {
            attempts,
            last_status,
            last_error,
            ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(last_status, Some(401));
            assert!(last_error.is_some());
        }
        other => panic!("Expected RequestFailure, got {other:?}"),
    }
    // Initial bootstrap plus one per retry.
    assert_eq!(upstream.home_hits(), 3);
}

// ============================================================================
// Fatal errors, cancellation and deadlines
// ============================================================================

#[tokio::test]
async fn test_connection_refused_aborts() {
    let upstream = start().await;
    let base_url = upstream.base_url();
    drop(upstream);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = NseClient::new(nse_client::ClientConfig {
        base_url,
        retry: RetryPolicy::unlimited(),
        ..Default::default()
    })
    .expect("Failed to create client");

    let err = client.market_status().await.unwrap_err();

    assert!(matches!(err, Error::Transport { .. }), "{err:?}");
}

#[tokio::test]
async fn test_timeout_aborts() {
    let upstream = start().await;
    upstream.set_default(
        MARKET_STATUS,
        Reply::json(json!({})).delayed(Duration::from_secs(5)),
    );
    let mut config = client_config(&upstream, RetryPolicy::unlimited());
    config.timeout = Duration::from_millis(200);
    let client = NseClient::new(config).expect("Failed to create client");

    let err = client.market_status().await.unwrap_err();

    assert!(matches!(err, Error::Transport { .. }), "{err:?}");
    assert_eq!(upstream.api_hits(MARKET_STATUS), 1);
}

/// Raw HTTP/1.1 server: `/` sets a session cookie, and the first API request
/// gets a body cut short of its declared `Content-Length`.
///
/// Returns the base URL and the home and API hit counters.
async fn start_truncating_upstream() -> (String, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let base_url = format!("http://{}", listener.local_addr().expect("Failed to get address"));
    let home_hits = Arc::new(AtomicUsize::new(0));
    let api_hits = Arc::new(AtomicUsize::new(0));
    let (home, api) = (Arc::clone(&home_hits), Arc::clone(&api_hits));

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let path = String::from_utf8_lossy(&request)
                .split_whitespace()
                .nth(1)
                .unwrap_or("/")
                .to_string();

            let response = if path == "/" {
                let session = home.fetch_add(1, Ordering::SeqCst) + 1;
                format!(
                    "HTTP/1.1 200 OK\r\nSet-Cookie: nsit=session-{session}; Path=/\r\n\
                     Content-Length: 2\r\nConnection: close\r\n\r\nok"
                )
            } else if api.fetch_add(1, Ordering::SeqCst) == 0 {
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                 Content-Length: 100\r\nConnection: close\r\n\r\n{\"ok"
                    .to_string()
            } else {
                let body = json!({"ok": true}).to_string();
                format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                )
            };
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (base_url, home_hits, api_hits)
}

#[tokio::test]
async fn test_truncated_body_rebootstraps_and_retries() {
    let (base_url, home_hits, api_hits) = start_truncating_upstream().await;
    let client = NseClient::new(nse_client::ClientConfig {
        base_url,
        timeout: Duration::from_secs(2),
        retry: RetryPolicy::limited(3)
            .expect("valid policy")
            .with_interval(Duration::from_millis(10)),
        ..Default::default()
    })
    .expect("Failed to create client");

    let body = client.market_status().await.expect("Request failed");

    assert_eq!(body, json!({"ok": true}));
    assert_eq!(home_hits.load(Ordering::SeqCst), 2);
    assert_eq!(api_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cancel_stops_unlimited_retries() {
    let upstream = start().await;
    upstream.set_default(MARKET_STATUS, Reply::status(500));
    let client = client_with(&upstream, RetryPolicy::unlimited());

    let cancel = client.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();
    });

    let err = client.market_status().await.unwrap_err();

    assert!(matches!(err, Error::Cancelled(_)), "{err:?}");
    assert!(upstream.api_hits(MARKET_STATUS) > 1);
}

#[tokio::test]
async fn test_cancelled_client_sends_nothing() {
    let upstream = start().await;
    upstream.set_default(MARKET_STATUS, Reply::json(json!({})));
    let client = create_test_client(&upstream).expect("Failed to create client");
    client.cancel_token().cancel();

    let err = client.market_status().await.unwrap_err();

    assert!(matches!(err, Error::Cancelled(_)));
    assert_eq!(upstream.home_hits(), 0);
    assert_eq!(upstream.total_api_hits(), 0);
}

#[tokio::test]
async fn test_deadline_bounds_unlimited_retries() {
    let upstream = start().await;
    upstream.set_default(MARKET_STATUS, Reply::status(500));
    let client = client_with(
        &upstream,
        RetryPolicy::unlimited().with_deadline(Duration::from_millis(300)),
    );

    let started = Instant::now();
    let err = client.market_status().await.unwrap_err();

    assert!(matches!(err, Error::DeadlineExceeded(_)), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(2));
}
