//! Browser-mimicking header set required by the upstream bot mitigation.

use crate::error::Error;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default user agent sent to the upstream.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/102.0.5005.115 Safari/537.36";

/// Headers attached to every request, bootstrap included.
///
/// The upstream rejects clients that do not look like a browser, and the exact
/// set it accepts drifts over time, so it stays configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrowserHeaders(BTreeMap<String, String>);

impl Default for BrowserHeaders {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("accept-language".to_string(), "en-GB;q=0.5".to_string());
        headers.insert("cache-control".to_string(), "no-cache".to_string());
        headers.insert("sec-fetch-dest".to_string(), "document".to_string());
        headers.insert("user-agent".to_string(), DEFAULT_USER_AGENT.to_string());
        Self(headers)
    }
}

impl BrowserHeaders {
    /// Creates an empty header set.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds or replaces a header. Names are stored lower-case.
    #[must_use]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Returns the value of a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no headers are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts to a reqwest header map.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if a name or value is not a valid HTTP header.
    pub fn to_header_map(&self) -> Result<HeaderMap, Error> {
        let mut map = HeaderMap::with_capacity(self.0.len());
        for (name, value) in &self.0 {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidArgument(format!("header name `{name}`: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| Error::InvalidArgument(format!("header `{name}` value: {e}")))?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers() {
        let headers = BrowserHeaders::default();

        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get("accept-language"), Some("en-GB;q=0.5"));
        assert_eq!(headers.get("cache-control"), Some("no-cache"));
        assert_eq!(headers.get("sec-fetch-dest"), Some("document"));
        assert_eq!(headers.get("User-Agent"), Some(DEFAULT_USER_AGENT));
    }

    #[test]
    fn test_override_header() {
        let headers = BrowserHeaders::default().with("User-Agent", "nse-chain/0.2");

        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get("user-agent"), Some("nse-chain/0.2"));
    }

    #[test]
    fn test_to_header_map() {
        let map = BrowserHeaders::default().to_header_map().unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map["cache-control"], "no-cache");
    }

    #[test]
    fn test_invalid_header_rejected() {
        let headers = BrowserHeaders::empty().with("bad header", "x");
        let err = headers.to_header_map().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_deserialize_from_toml_like_map() {
        let headers: BrowserHeaders =
            serde_json::from_str(r#"{"user-agent": "curl/8", "accept": "*/*"}"#).unwrap();
        assert_eq!(headers.get("accept"), Some("*/*"));
        assert!(!headers.is_empty());
    }
}
