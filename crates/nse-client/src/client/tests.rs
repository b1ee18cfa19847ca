//! Unit tests for client module.

use super::*;

#[test]
fn test_client_config_default() {
    let config = ClientConfig::default();
    assert_eq!(config.base_url, "https://www.nseindia.com");
    assert_eq!(config.timeout, Duration::from_secs(4));
    assert_eq!(config.retry, RetryPolicy::default());
    assert_eq!(config.headers, BrowserHeaders::default());
    assert!(config.cookie_cache.is_none());
}

#[test]
fn test_client_new_is_lazy() {
    let client = NseClient::new(ClientConfig::default()).unwrap();
    assert!(!client.is_bootstrapped());
    assert_eq!(client.session().generation(), 0);
}

#[test]
fn test_client_with_base_url() {
    let client = NseClient::with_base_url("http://127.0.0.1:8080").unwrap();
    assert_eq!(
        client.endpoints().home_url().as_str(),
        "http://127.0.0.1:8080/"
    );
    assert_eq!(client.session().home_url(), client.endpoints().home_url());
}

#[test]
fn test_client_rejects_bad_base_url() {
    let err = NseClient::with_base_url("nseindia").unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));
}

#[test]
fn test_client_rejects_bad_header() {
    let config = ClientConfig {
        headers: BrowserHeaders::default().with("x-bad", "line\nbreak"),
        ..Default::default()
    };
    assert!(NseClient::new(config).unwrap_err().is_invalid_argument());
}

#[test]
fn test_clones_share_cancel_token() {
    let client = NseClient::with_base_url("http://127.0.0.1:8080").unwrap();
    let clone = client.clone();

    client.cancel_token().cancel();
    assert!(clone.cancel_token().is_cancelled());
}

#[tokio::test]
async fn test_cancelled_client_fails_fast() {
    let client = NseClient::with_base_url("http://127.0.0.1:9").unwrap();
    client.cancel_token().cancel();

    let err = client.market_status().await.unwrap_err();
    assert!(matches!(err, Error::Cancelled(ref name) if name == "market_status"));
    assert!(!client.is_bootstrapped());
}

#[tokio::test]
async fn test_invalid_argument_before_io() {
    let client = NseClient::with_base_url("http://127.0.0.1:9").unwrap();

    let err = client.option_chain("", SymbolKind::Index).await.unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(!client.is_bootstrapped());
}
