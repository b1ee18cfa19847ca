//! Column naming for the normalized option table.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the chain a metric belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// Call options (`CE` in the payload).
    Call,
    /// Put options (`PE` in the payload).
    Put,
}

impl Side {
    /// Both sides, call first.
    pub const ALL: [Side; 2] = [Side::Call, Side::Put];

    /// Payload key of the side.
    #[must_use]
    pub fn payload_key(&self) -> &'static str {
        match self {
            Self::Call => "CE",
            Self::Put => "PE",
        }
    }

    fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "Call" | "CE" => Some(Self::Call),
            "Put" | "PE" => Some(Self::Put),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "Call"),
            Self::Put => write!(f, "Put"),
        }
    }
}

/// Per-side metric kept by the normalizer.
///
/// Bid and ask quantities and prices are not modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    /// Underlying symbol.
    Underlying,
    /// Contract identifier.
    Identifier,
    /// Open interest.
    OpenInterest,
    /// Change in open interest.
    ChangeInOpenInterest,
    /// Percentage change in open interest.
    PChangeInOpenInterest,
    /// Total traded volume.
    TotalTradedVolume,
    /// Implied volatility.
    ImpliedVolatility,
    /// Last traded price.
    LastPrice,
    /// Price change.
    Change,
    /// Percentage price change.
    PChange,
    /// Total buy quantity.
    TotalBuyQuantity,
    /// Total sell quantity.
    TotalSellQuantity,
}

impl Metric {
    /// Every metric in column order.
    pub const ALL: [Metric; 12] = [
        Metric::Underlying,
        Metric::Identifier,
        Metric::OpenInterest,
        Metric::ChangeInOpenInterest,
        Metric::PChangeInOpenInterest,
        Metric::TotalTradedVolume,
        Metric::ImpliedVolatility,
        Metric::LastPrice,
        Metric::Change,
        Metric::PChange,
        Metric::TotalBuyQuantity,
        Metric::TotalSellQuantity,
    ];

    /// Field name in the upstream payload.
    #[must_use]
    pub fn raw_key(&self) -> &'static str {
        match self {
            Self::Underlying => "underlying",
            Self::Identifier => "identifier",
            Self::OpenInterest => "openInterest",
            Self::ChangeInOpenInterest => "changeinOpenInterest",
            Self::PChangeInOpenInterest => "pchangeinOpenInterest",
            Self::TotalTradedVolume => "totalTradedVolume",
            Self::ImpliedVolatility => "impliedVolatility",
            Self::LastPrice => "lastPrice",
            Self::Change => "change",
            Self::PChange => "pChange",
            Self::TotalBuyQuantity => "totalBuyQuantity",
            Self::TotalSellQuantity => "totalSellQuantity",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Underlying => "Underlying",
            Self::Identifier => "Identifier",
            Self::OpenInterest => "Open Interest",
            Self::ChangeInOpenInterest => "Change in Open Interest",
            Self::PChangeInOpenInterest => "P.Change in Open Interest",
            Self::TotalTradedVolume => "Total Traded Volume",
            Self::ImpliedVolatility => "Implied Volatility",
            Self::LastPrice => "Last Price",
            Self::Change => "Change",
            Self::PChange => "P.Change",
            Self::TotalBuyQuantity => "Total Buy Quantity",
            Self::TotalSellQuantity => "Total Sell Quantity",
        }
    }

    /// True for the text-valued metrics.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Underlying | Self::Identifier)
    }

    fn resolve(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.label() == name || m.raw_key() == name)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A column of the normalized table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    /// Join key: strike.
    StrikePrice,
    /// Join key: expiry.
    ExpiryDate,
    /// Underlying price at snapshot time.
    UnderlyingValue,
    /// A side-prefixed metric, e.g. `Call Open Interest`.
    Metric(Side, Metric),
}

impl Column {
    /// Key columns shared by both sides.
    pub const BASE: [Column; 3] = [
        Column::StrikePrice,
        Column::ExpiryDate,
        Column::UnderlyingValue,
    ];

    /// Every column in display order: base columns, call metrics, put metrics.
    #[must_use]
    pub fn all() -> Vec<Column> {
        let mut columns = Self::BASE.to_vec();
        for side in Side::ALL {
            columns.extend(Metric::ALL.into_iter().map(|m| Column::Metric(side, m)));
        }
        columns
    }

    /// Resolves a column name in canonical (`Call Open Interest`), suffixed
    /// (`Open Interest Call`) or raw (`openInterest_CE`) form.
    ///
    /// Returns `None` for names that are not part of the table, bid/ask
    /// columns included.
    #[must_use]
    pub fn parse(name: &str) -> Option<Column> {
        let name = name.trim();
        match name {
            "Strike Price" | "strikePrice" => return Some(Column::StrikePrice),
            "Expiry Date" | "expiryDate" => return Some(Column::ExpiryDate),
            "Underlying Value" | "underlyingValue" => return Some(Column::UnderlyingValue),
            _ => {}
        }

        let (side, rest) = split_side_marker(name)?;
        Metric::resolve(rest).map(|metric| Column::Metric(side, metric))
    }
}

/// Splits a leading or trailing side marker off a column name.
fn split_side_marker(name: &str) -> Option<(Side, &str)> {
    let separators: &[char] = &[' ', '_'];
    let leading = name
        .split_once(separators)
        .and_then(|(first, rest)| Side::from_marker(first).map(|side| (side, rest.trim())));
    leading.or_else(|| {
        let (rest, last) = name.rsplit_once(separators)?;
        Side::from_marker(last).map(|side| (side, rest.trim()))
    })
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StrikePrice => write!(f, "Strike Price"),
            Self::ExpiryDate => write!(f, "Expiry Date"),
            Self::UnderlyingValue => write!(f, "Underlying Value"),
            Self::Metric(side, metric) => write!(f, "{side} {metric}"),
        }
    }
}

/// A single table value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    /// Exact decimal (strike, underlying value).
    Decimal(Decimal),
    /// Floating-point metric.
    Number(f64),
    /// Text metric.
    Text(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Missing value, e.g. the absent side of a one-sided row.
    Null,
}

impl Cell {
    /// Returns true for [`Cell::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric value, if any.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Decimal(d) => rust_decimal::prelude::ToPrimitive::to_f64(d),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format("%d-%m-%Y")),
            Self::Null => Ok(()),
        }
    }
}
