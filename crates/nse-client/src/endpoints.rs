//! Request builders for every supported NSE operation.
//!
//! Builders are pure: they validate arguments and produce a
//! [`RequestDescriptor`] without touching the network.

use crate::error::Error;
use crate::request::RequestDescriptor;
use crate::types::{DateRange, HistoryDerivativesQuery, Section, Segment, Series, SymbolKind};
use std::time::Duration;
use url::Url;


/// Format of `expiryDate` on the historical derivatives endpoint (`27-Oct-2022`).
pub const EXPIRY_PARAM_FORMAT: &str = "%d-%b-%Y";

pub(crate) const PATH_OPTION_CHAIN_INDICES: &str = "option-chain-indices";
pub(crate) const PATH_OPTION_CHAIN_EQUITIES: &str = "option-chain-equities";
pub(crate) const PATH_META_INFO: &str = "equity-meta-info";
pub(crate) const PATH_QUOTE_EQUITY: &str = "quote-equity";
pub(crate) const PATH_QUOTE_DERIVATIVE: &str = "quote-derivative";
pub(crate) const PATH_CHART_DATA: &str = "chart-databyindex";
pub(crate) const PATH_HISTORY_DERIVATIVES: &str = "historical/fo/derivatives";
pub(crate) const PATH_HISTORY_DERIVATIVES_META: &str = "historical/fo/derivatives/meta";
pub(crate) const PATH_HISTORY_EQUITY: &str = "historical/cm/equity";
pub(crate) const PATH_BULK_AND_BLOCK: &str = "historical/cm/bulkAndblock";
pub(crate) const PATH_HIGH_LOW: &str = "historical/cm/high-low";
pub(crate) const PATH_MASTER: &str = "master-quote";
pub(crate) const PATH_DAILY_REPORT: &str = "merged-daily-reports";
pub(crate) const PATH_MARKET_TURNOVER: &str = "market-turnover";
pub(crate) const PATH_SEARCH: &str = "search/autocomplete";
pub(crate) const PATH_MARKET_STATUS: &str = "marketStatus";
pub(crate) const PATH_INDEX_STOCKS: &str = "equity-stockIndices";

/// Builds request descriptors against a base URL.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: Url,
    timeout: Duration,
}

impl Endpoints {
    /// Creates builders for `base_url` (e.g. `https://www.nseindia.com`).
    ///
    /// # Errors
    /// Returns `InvalidUrl` if the base URL does not parse.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { base_url, timeout })
    }

    /// Home page used for the session bootstrap.
    #[must_use]
    pub fn home_url(&self) -> &Url {
        &self.base_url
    }

    fn api(&self, name: &'static str, path: &str) -> Result<RequestDescriptor, Error> {
        let url = self.base_url.join(&format!("api/{path}"))?;
        Ok(RequestDescriptor::new(name, url, self.timeout))
    }

    // ========================================================================
    // Option chain & quotes
    // ========================================================================

    /// Option chain for an index or equity.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty symbol.
    pub fn option_chain(
        &self,
        symbol: &str,
        kind: SymbolKind,
    ) -> Result<RequestDescriptor, Error> {
        let path = match kind {
            SymbolKind::Index => PATH_OPTION_CHAIN_INDICES,
            SymbolKind::Equity => PATH_OPTION_CHAIN_EQUITIES,
        };
        Ok(self
            .api("option_chain", path)?
            .param("symbol", normalize_symbol(symbol)?))
    }

    /// Equity metadata.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty symbol.
    pub fn meta_info(&self, symbol: &str) -> Result<RequestDescriptor, Error> {
        Ok(self
            .api("meta_info", PATH_META_INFO)?
            .param("symbol", normalize_symbol(symbol)?))
    }

    /// Equity quote section.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty symbol.
    pub fn quote(&self, symbol: &str, section: Section) -> Result<RequestDescriptor, Error> {
        Ok(self
            .api("quote", PATH_QUOTE_EQUITY)?
            .param("symbol", normalize_symbol(symbol)?)
            .param("section", section.as_str()))
    }

    /// Corporate information for an equity.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty symbol.
    pub fn corp_info(&self, symbol: &str) -> Result<RequestDescriptor, Error> {
        Ok(self
            .api("corp_info", PATH_QUOTE_EQUITY)?
            .param("symbol", normalize_symbol(symbol)?)
            .param("section", Section::CorpInfo.as_str()))
    }

    /// Derivative quote, optionally for one contract.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty symbol.
    pub fn quote_derivative(
        &self,
        symbol: &str,
        identifier: Option<&str>,
    ) -> Result<RequestDescriptor, Error> {
        Ok(self
            .api("quote_derivative", PATH_QUOTE_DERIVATIVE)?
            .param("symbol", normalize_symbol(symbol)?)
            .param_opt("identifier", identifier))
    }

    /// Intraday chart data. Equities are addressed as `<SYMBOL>EQN`.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty symbol.
    pub fn chart_data(
        &self,
        symbol: &str,
        kind: SymbolKind,
        preopen: bool,
    ) -> Result<RequestDescriptor, Error> {
        let symbol = normalize_symbol(symbol)?;
        let req = self.api("chart_data", PATH_CHART_DATA)?;
        let req = match kind {
            SymbolKind::Index => req.param("index", symbol).param("indices", "true"),
            SymbolKind::Equity => req.param("index", format!("{symbol}EQN")),
        };
        Ok(if preopen {
            req.param("preopen", "true")
        } else {
            req
        })
    }

    // ========================================================================
    // Historical
    // ========================================================================

    /// Historical derivative prices.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty symbol or a non-finite or
    /// negative strike.
    pub fn history_derivatives(
        &self,
        query: &HistoryDerivativesQuery,
    ) -> Result<RequestDescriptor, Error> {
        let mut req = self
            .api("history_derivatives", PATH_HISTORY_DERIVATIVES)?
            .param("symbol", normalize_symbol(&query.symbol)?)
            .param_opt("identifier", query.identifier.as_deref());
        req = with_range(req, query.range.as_ref());
        req = req.param_opt("optionType", query.option_type.map(|t| t.as_str()));
        if let Some(strike) = query.strike_price {
            if !strike.is_finite() || strike < 0.0 {
                return Err(Error::InvalidArgument(format!(
                    "strike_price {strike} must be a non-negative number"
                )));
            }
            req = req.param("strikePrice", format!("{strike:.2}"));
        }
        Ok(req
            .param_opt(
                "expiryDate",
                query
                    .expiry_date
                    .map(|d| d.format(EXPIRY_PARAM_FORMAT).to_string()),
            )
            .param_opt(
                "instrumentType",
                query.instrument_type.map(|t| t.as_str()),
            ))
    }

    /// Filter metadata for the historical derivatives endpoint.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty symbol.
    pub fn history_derivatives_meta(
        &self,
        symbol: &str,
        identifier: Option<&str>,
    ) -> Result<RequestDescriptor, Error> {
        Ok(self
            .api("history_derivatives_meta", PATH_HISTORY_DERIVATIVES_META)?
            .param("symbol", normalize_symbol(symbol)?)
            .param_opt("identifier", identifier))
    }

    /// Historical equity prices. `series` is sent JSON-quoted (`"EQ"`).
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty symbol.
    pub fn history_equity(
        &self,
        symbol: &str,
        range: Option<&DateRange>,
        series: Option<Series>,
    ) -> Result<RequestDescriptor, Error> {
        let req = self
            .api("history_equity", PATH_HISTORY_EQUITY)?
            .param("symbol", normalize_symbol(symbol)?);
        Ok(with_range(req, range).param_opt("series", series.map(|s| format!("\"{s}\""))))
    }

    /// Bulk and block deals.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty symbol.
    pub fn bulk_and_block(
        &self,
        symbol: &str,
        range: Option<&DateRange>,
    ) -> Result<RequestDescriptor, Error> {
        let req = self
            .api("bulk_and_block", PATH_BULK_AND_BLOCK)?
            .param("symbol", normalize_symbol(symbol)?);
        Ok(with_range(req, range))
    }

    /// 52-week or period high/low. `month` is only sent together with `year`.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty symbol or a month outside 1..=12.
    pub fn high_low(
        &self,
        symbol: &str,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Result<RequestDescriptor, Error> {
        if let Some(month) = month.filter(|m| !(1..=12).contains(m)) {
            return Err(Error::InvalidArgument(format!(
                "month {month} must be within 1..=12"
            )));
        }
        let req = self
            .api("high_low", PATH_HIGH_LOW)?
            .param("symbol", normalize_symbol(symbol)?);
        Ok(match year {
            Some(year) => req
                .param("year", year.to_string())
                .param_opt("month", month.map(|m| m.to_string())),
            None => req,
        })
    }

    // ========================================================================
    // Market-wide
    // ========================================================================

    /// Master list of derivative underlyings.
    ///
    /// # Errors
    /// Returns `InvalidUrl` only if the base URL cannot be joined.
    pub fn master(&self) -> Result<RequestDescriptor, Error> {
        self.api("master", PATH_MASTER)
    }

    /// Merged daily reports for a segment.
    ///
    /// # Errors
    /// Returns `InvalidUrl` only if the base URL cannot be joined.
    pub fn daily_report(&self, segment: Segment) -> Result<RequestDescriptor, Error> {
        Ok(self
            .api("daily_report", PATH_DAILY_REPORT)?
            .param("key", segment.key()))
    }

    /// Market turnover.
    ///
    /// # Errors
    /// Returns `InvalidUrl` only if the base URL cannot be joined.
    pub fn market_turnover(&self) -> Result<RequestDescriptor, Error> {
        self.api("market_turnover", PATH_MARKET_TURNOVER)
    }

    /// Symbol autocomplete.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty query.
    pub fn search(&self, query: &str) -> Result<RequestDescriptor, Error> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidArgument("search query is empty".to_string()));
        }
        Ok(self.api("search", PATH_SEARCH)?.param("q", query))
    }

    /// Market open/close status.
    ///
    /// # Errors
    /// Returns `InvalidUrl` only if the base URL cannot be joined.
    pub fn market_status(&self) -> Result<RequestDescriptor, Error> {
        self.api("market_status", PATH_MARKET_STATUS)
    }

    /// Constituents of an index (e.g. `NIFTY 50`).
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty index name.
    pub fn index_stocks(&self, index: &str) -> Result<RequestDescriptor, Error> {
        Ok(self
            .api("index_stocks", PATH_INDEX_STOCKS)?
            .param("index", normalize_symbol(index)?))
    }
}

fn with_range(req: RequestDescriptor, range: Option<&DateRange>) -> RequestDescriptor {
    match range {
        Some(range) => {
            let [(from_key, from), (to_key, to)] = range.params();
            req.param(from_key, from).param(to_key, to)
        }
        None => req,
    }
}

/// Trims and upper-cases a symbol.
///
/// # Errors
/// Returns `InvalidArgument` if the symbol is blank.
pub fn normalize_symbol(symbol: &str) -> Result<String, Error> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(Error::InvalidArgument("symbol is empty".to_string()));
    }
    Ok(symbol.to_uppercase())
}
