//! Request argument types for the NSE API.
//!
//! Every enumerated argument the upstream accepts is a closed Rust enum, so an
//! out-of-domain value can only come from string parsing, which fails with
//! [`Error::InvalidArgument`] before any request is built.

use crate::error::Error;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;


/// Date format used by the historical endpoints (`23-09-2022`).
pub const HISTORY_DATE_FORMAT: &str = "%d-%m-%Y";

/// Whether a symbol is an index (NIFTY) or an equity (RELIANCE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// Index symbol, served by the `*-indices` endpoints.
    Index,
    /// Equity symbol, served by the `*-equities` endpoints.
    Equity,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index => write!(f, "index"),
            Self::Equity => write!(f, "equity"),
        }
    }
}

/// Quote section for `quote-equity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Trade information (order book, deliveries, block deals).
    TradeInfo,
    /// Corporate information (announcements, results, actions).
    CorpInfo,
}

impl Section {
    /// Wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TradeInfo => "trade_info",
            Self::CorpInfo => "corp_info",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trade_info" => Ok(Self::TradeInfo),
            "corp_info" => Ok(Self::CorpInfo),
            other => Err(Error::InvalidArgument(format!(
                "section `{other}` must be trade_info or corp_info"
            ))),
        }
    }
}

/// Market segment for daily reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    /// Capital market.
    Capital,
    /// Derivatives market.
    Derivative,
    /// Debt market.
    Debt,
}

impl Segment {
    /// Wire value sent as the `key` parameter.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Capital => "favCapital",
            Self::Derivative => "favDerivatives",
            Self::Debt => "favDebt",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capital => write!(f, "capital"),
            Self::Derivative => write!(f, "derivative"),
            Self::Debt => write!(f, "debt"),
        }
    }
}

impl FromStr for Segment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "capital" | "favCapital" => Ok(Self::Capital),
            "derivative" | "favDerivatives" => Ok(Self::Derivative),
            "debt" | "favDebt" => Ok(Self::Debt),
            other => Err(Error::InvalidArgument(format!(
                "segment `{other}` must be capital, derivative or debt"
            ))),
        }
    }
}

/// Option type: call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum OptionType {
    /// Call option.
    CE,
    /// Put option.
    PE,
}

impl OptionType {
    /// Wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CE => "CE",
            Self::PE => "PE",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CE" => Ok(Self::CE),
            "PE" => Ok(Self::PE),
            other => Err(Error::InvalidArgument(format!(
                "option_type `{other}` must be CE or PE"
            ))),
        }
    }
}

/// Derivative instrument type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum InstrumentType {
    /// Index futures.
    FUTIDX,
    /// Index options.
    OPTIDX,
}

impl InstrumentType {
    /// Wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FUTIDX => "FUTIDX",
            Self::OPTIDX => "OPTIDX",
        }
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstrumentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FUTIDX" => Ok(Self::FUTIDX),
            "OPTIDX" => Ok(Self::OPTIDX),
            other => Err(Error::InvalidArgument(format!(
                "instrument_type `{other}` must be FUTIDX or OPTIDX"
            ))),
        }
    }
}

/// Equity series accepted by the historical equity endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Series {
    /// AF series.
    AF,
    /// BL series.
    BL,
    /// EQ series (regular equity).
    EQ,
    /// RL series.
    RL,
}

impl Series {
    /// All accepted series.
    pub const ALL: [Series; 4] = [Series::AF, Series::BL, Series::EQ, Series::RL];

    /// Wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AF => "AF",
            Self::BL => "BL",
            Self::EQ => "EQ",
            Self::RL => "RL",
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Series {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Series::ALL
            .into_iter()
            .find(|series| series.as_str() == s)
            .ok_or_else(|| {
                Error::InvalidArgument(format!("series `{s}` must be one of AF, BL, EQ, RL"))
            })
    }
}

/// Inclusive date range for the historical endpoints.
///
/// `from` and `to` travel together; a range with only one bound cannot be
/// constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    /// Creates a range.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `from` is after `to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, Error> {
        if from > to {
            return Err(Error::InvalidArgument(format!(
                "date range start {from} is after end {to}"
            )));
        }
        Ok(Self { from, to })
    }

    /// Parses a range from two `dd-mm-yyyy` strings.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if either date is malformed or the range is inverted.
    pub fn parse(from: &str, to: &str) -> Result<Self, Error> {
        let parse = |value: &str| {
            NaiveDate::parse_from_str(value, HISTORY_DATE_FORMAT).map_err(|e| {
                Error::InvalidArgument(format!("date `{value}` is not dd-mm-yyyy: {e}"))
            })
        };
        Self::new(parse(from)?, parse(to)?)
    }

    /// Start of the range.
    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.from
    }

    /// End of the range.
    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.to
    }

    /// Query parameters for the range, `from` first.
    #[must_use]
    pub fn params(&self) -> [(&'static str, String); 2] {
        [
            ("from", self.from.format(HISTORY_DATE_FORMAT).to_string()),
            ("to", self.to.format(HISTORY_DATE_FORMAT).to_string()),
        ]
    }
}

/// Filters for `historical/fo/derivatives`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryDerivativesQuery {
    /// Underlying symbol (e.g. "NIFTY").
    pub symbol: String,
    /// Contract identifier (e.g. "OPTIDXNIFTY27-10-2022CE13950.00").
    pub identifier: Option<String>,
    /// Date range.
    pub range: Option<DateRange>,
    /// Option type.
    pub option_type: Option<OptionType>,
    /// Strike price.
    pub strike_price: Option<f64>,
    /// Expiry date (sent as `dd-Mon-yyyy`).
    pub expiry_date: Option<NaiveDate>,
    /// Instrument type.
    pub instrument_type: Option<InstrumentType>,
}

impl HistoryDerivativesQuery {
    /// Creates a query for a symbol with no filters.
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            ..Default::default()
        }
    }

    /// Restricts the query to a contract identifier.
    #[must_use]
    pub fn identifier(mut self, identifier: &str) -> Self {
        self.identifier = Some(identifier.to_string());
        self
    }

    /// Restricts the query to a date range.
    #[must_use]
    pub fn range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Restricts the query to an option type.
    #[must_use]
    pub fn option_type(mut self, option_type: OptionType) -> Self {
        self.option_type = Some(option_type);
        self
    }

    /// Restricts the query to a strike.
    #[must_use]
    pub fn strike_price(mut self, strike_price: f64) -> Self {
        self.strike_price = Some(strike_price);
        self
    }

    /// Restricts the query to an expiry.
    #[must_use]
    pub fn expiry_date(mut self, expiry_date: NaiveDate) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    /// Restricts the query to an instrument type.
    #[must_use]
    pub fn instrument_type(mut self, instrument_type: InstrumentType) -> Self {
        self.instrument_type = Some(instrument_type);
        self
    }
}
