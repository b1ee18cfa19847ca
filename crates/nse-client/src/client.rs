//! HTTP client for the NSE market-data API.

use crate::cookies::CookieCache;
use crate::endpoints::Endpoints;
use crate::error::Error;
use crate::executor::Executor;
use crate::headers::BrowserHeaders;
use crate::request::RequestDescriptor;
use crate::retry::{CancelToken, RetryPolicy};
use crate::session::Session;
use crate::types::{DateRange, HistoryDerivativesQuery, Section, Segment, Series, SymbolKind};
use reqwest::Client;
use reqwest::cookie::Jar;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
mod tests;

/// Default upstream.
pub const DEFAULT_BASE_URL: &str = "https://www.nseindia.com";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the site (e.g., "https://www.nseindia.com").
    pub base_url: String,
    /// Per-attempt timeout, bootstrap included.
    pub timeout: Duration,
    /// Retry policy for API calls.
    pub retry: RetryPolicy,
    /// Headers sent with every request.
    pub headers: BrowserHeaders,
    /// Optional cookie cache file.
    pub cookie_cache: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            headers: BrowserHeaders::default(),
            cookie_cache: None,
        }
    }
}

#[derive(Debug)]
struct Inner {
    endpoints: Endpoints,
    session: Arc<Session>,
    executor: Executor,
    cancel: CancelToken,
}

/// Session-aware client. Clones share the connection pool, the cookie
/// session and the cancel token.
#[derive(Debug, Clone)]
pub struct NseClient {
    inner: Arc<Inner>,
}

impl NseClient {
    /// Creates a new client with the given configuration.
    ///
    /// No request is made; the session bootstraps lazily on the first call.
    ///
    /// # Errors
    /// Returns error if the base URL or a header is invalid, or the HTTP
    /// client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let endpoints = Endpoints::new(&config.base_url, config.timeout)?;
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .default_headers(config.headers.to_header_map()?)
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        let session = Arc::new(Session::new(
            http.clone(),
            jar,
            endpoints.home_url().clone(),
            config.timeout,
            config.cookie_cache.map(CookieCache::new),
        ));
        let cancel = CancelToken::new();
        let executor = Executor::new(http, Arc::clone(&session), config.retry, cancel.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                endpoints,
                session,
                executor,
                cancel,
            }),
        })
    }

    /// Creates a new client with default configuration against `base_url`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        Self::new(ClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
    }

    // ========================================================================
    // Session & control
    // ========================================================================

    /// Request builders bound to this client's base URL.
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    /// The shared cookie session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Visits the home page to obtain session cookies.
    pub async fn bootstrap(&self) -> bool {
        self.inner.session.bootstrap().await
    }

    /// Returns true if the session holds usable cookies.
    #[must_use]
    pub fn is_bootstrapped(&self) -> bool {
        self.inner.session.is_bootstrapped()
    }

    /// Token that cancels every in-flight and future request of this client.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.inner.cancel.clone()
    }

    /// Retry policy in effect.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        self.inner.executor.policy()
    }

    /// Executes a prebuilt request.
    ///
    /// # Errors
    /// Returns error if the request fails; see [`Executor::execute`].
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<Value, Error> {
        self.inner.executor.execute(request).await
    }

    // ========================================================================
    // Option chain & quotes
    // ========================================================================

    /// Gets the option chain of an index or equity.
    ///
    /// # Errors
    /// Returns error if the symbol is empty or the request fails.
    pub async fn option_chain(&self, symbol: &str, kind: SymbolKind) -> Result<Value, Error> {
        let request = self.endpoints().option_chain(symbol, kind)?;
        self.execute(&request).await
    }

    /// Gets equity metadata.
    ///
    /// # Errors
    /// Returns error if the symbol is empty or the request fails.
    pub async fn meta_info(&self, symbol: &str) -> Result<Value, Error> {
        let request = self.endpoints().meta_info(symbol)?;
        self.execute(&request).await
    }

    /// Gets a quote section of an equity.
    ///
    /// # Errors
    /// Returns error if the symbol is empty or the request fails.
    pub async fn quote(&self, symbol: &str, section: Section) -> Result<Value, Error> {
        let request = self.endpoints().quote(symbol, section)?;
        self.execute(&request).await
    }

    /// Gets corporate information of an equity.
    ///
    /// # Errors
    /// Returns error if the symbol is empty or the request fails.
    pub async fn corp_info(&self, symbol: &str) -> Result<Value, Error> {
        let request = self.endpoints().corp_info(symbol)?;
        self.execute(&request).await
    }

    /// Gets derivative quotes, optionally for one contract.
    ///
    /// # Errors
    /// Returns error if the symbol is empty or the request fails.
    pub async fn quote_derivative(
        &self,
        symbol: &str,
        identifier: Option<&str>,
    ) -> Result<Value, Error> {
        let request = self.endpoints().quote_derivative(symbol, identifier)?;
        self.execute(&request).await
    }

    /// Gets intraday chart data.
    ///
    /// # Errors
    /// Returns error if the symbol is empty or the request fails.
    pub async fn chart_data(
        &self,
        symbol: &str,
        kind: SymbolKind,
        preopen: bool,
    ) -> Result<Value, Error> {
        let request = self.endpoints().chart_data(symbol, kind, preopen)?;
        self.execute(&request).await
    }

    // ========================================================================
    // Historical
    // ========================================================================

    /// Gets historical derivative prices.
    ///
    /// # Errors
    /// Returns error if the query is invalid or the request fails.
    pub async fn history_derivatives(
        &self,
        query: &HistoryDerivativesQuery,
    ) -> Result<Value, Error> {
        let request = self.endpoints().history_derivatives(query)?;
        self.execute(&request).await
    }

    /// Gets the filter metadata of the historical derivatives endpoint.
    ///
    /// # Errors
    /// Returns error if the symbol is empty or the request fails.
    pub async fn history_derivatives_meta(
        &self,
        symbol: &str,
        identifier: Option<&str>,
    ) -> Result<Value, Error> {
        let request = self
            .endpoints()
            .history_derivatives_meta(symbol, identifier)?;
        self.execute(&request).await
    }

    /// Gets historical equity prices.
    ///
    /// # Errors
    /// Returns error if the symbol is empty or the request fails.
    pub async fn history_equity(
        &self,
        symbol: &str,
        range: Option<&DateRange>,
        series: Option<Series>,
    ) -> Result<Value, Error> {
        let request = self.endpoints().history_equity(symbol, range, series)?;
        self.execute(&request).await
    }

    /// Gets bulk and block deals.
    ///
    /// # Errors
    /// Returns error if the symbol is empty or the request fails.
    pub async fn bulk_and_block(
        &self,
        symbol: &str,
        range: Option<&DateRange>,
    ) -> Result<Value, Error> {
        let request = self.endpoints().bulk_and_block(symbol, range)?;
        self.execute(&request).await
    }

    /// Gets the high/low of a period.
    ///
    /// # Errors
    /// Returns error if the arguments are invalid or the request fails.
    pub async fn high_low(
        &self,
        symbol: &str,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Result<Value, Error> {
        let request = self.endpoints().high_low(symbol, year, month)?;
        self.execute(&request).await
    }

    // ========================================================================
    // Market-wide
    // ========================================================================

    /// Gets the master list of derivative underlyings.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn master(&self) -> Result<Value, Error> {
        let request = self.endpoints().master()?;
        self.execute(&request).await
    }

    /// Gets merged daily reports for a segment.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn daily_report(&self, segment: Segment) -> Result<Value, Error> {
        let request = self.endpoints().daily_report(segment)?;
        self.execute(&request).await
    }

    /// Gets the market turnover.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn market_turnover(&self) -> Result<Value, Error> {
        let request = self.endpoints().market_turnover()?;
        self.execute(&request).await
    }

    /// Searches symbols.
    ///
    /// # Errors
    /// Returns error if the query is empty or the request fails.
    pub async fn search(&self, query: &str) -> Result<Value, Error> {
        let request = self.endpoints().search(query)?;
        self.execute(&request).await
    }

    /// Gets the market status.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn market_status(&self) -> Result<Value, Error> {
        let request = self.endpoints().market_status()?;
        self.execute(&request).await
    }

    /// Gets the constituents of an index.
    ///
    /// # Errors
    /// Returns error if the index name is empty or the request fails.
    pub async fn index_stocks(&self, index: &str) -> Result<Value, Error> {
        let request = self.endpoints().index_stocks(index)?;
        self.execute(&request).await
    }
}
