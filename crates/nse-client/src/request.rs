//! Immutable description of one logical API call.

use crate::error::Error;
use std::time::Duration;
use url::Url;

/// Everything the executor needs to issue a GET.
///
/// Parameter order is preserved on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    name: &'static str,
    url: Url,
    params: Vec<(String, String)>,
    timeout: Duration,
}

impl RequestDescriptor {
    /// Creates a descriptor with no parameters.
    #[must_use]
    pub fn new(name: &'static str, url: Url, timeout: Duration) -> Self {
        Self {
            name,
            url,
            params: Vec::new(),
            timeout,
        }
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    /// Appends a query parameter when present.
    #[must_use]
    pub fn param_opt(self, key: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    /// Logical name used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Endpoint URL without the query string.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Ordered query parameters.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Returns the value of the first parameter named `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Per-attempt timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// URL with the encoded query string.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the parameters cannot be form-encoded.
    pub fn full_url(&self) -> Result<Url, Error> {
        let mut url = self.url.clone();
        if self.params.is_empty() {
            url.set_query(None);
        } else {
            let query = serde_urlencoded::to_string(&self.params)
                .map_err(|e| Error::InvalidArgument(format!("{}: {e}", self.name)))?;
            url.set_query(Some(&query));
        }
        Ok(url)
    }
}
