//! Raw option-chain payload as served by the upstream.
//!
//! Fields are lenient: numbers may arrive as JSON numbers or numeric strings,
//! and anything the table does not model (bid/ask, totals) is ignored.

use crate::error::ChainError;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

/// Top-level option-chain response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOptionChain {
    /// Every strike and expiry.
    pub records: Option<RawSection>,
    /// Strikes of the nearest expiry.
    pub filtered: Option<RawSection>,
}

/// `records` or `filtered` block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSection {
    /// Chain entries.
    pub data: Option<Vec<RawEntry>>,
    /// Snapshot time, `dd-MMM-yyyy HH:mm:ss`.
    pub timestamp: Option<String>,
    /// Underlying price at snapshot time.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub underlying_value: Option<Decimal>,
}

/// One strike/expiry entry with at most one quote per side.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntry {
    /// Strike.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub strike_price: Option<Decimal>,
    /// Expiry, day first.
    pub expiry_date: Option<String>,
    /// Call quote.
    #[serde(rename = "CE")]
    pub call: Option<RawQuote>,
    /// Put quote.
    #[serde(rename = "PE")]
    pub put: Option<RawQuote>,
}

/// Quote of one side.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuote {
    /// Strike price; the entry's takes precedence.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub strike_price: Option<Decimal>,
    /// Expiry as sent, e.g. `27-Oct-2022`.
    pub expiry_date: Option<String>,
    /// Underlying symbol.
    pub underlying: Option<String>,
    /// Contract identifier.
    pub identifier: Option<String>,
    /// Underlying value.
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub underlying_value: Option<Decimal>,
    /// Open interest.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub open_interest: Option<f64>,
    /// Change in open interest.
    #[serde(default, deserialize_with = "lenient_f64", rename = "changeinOpenInterest")]
    pub change_in_open_interest: Option<f64>,
    /// Percentage change in open interest.
    #[serde(default, deserialize_with = "lenient_f64", rename = "pchangeinOpenInterest")]
    pub pchange_in_open_interest: Option<f64>,
    /// Traded volume.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_traded_volume: Option<f64>,
    /// Implied volatility.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub implied_volatility: Option<f64>,
    /// Last traded price.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub last_price: Option<f64>,
    /// Price change.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub change: Option<f64>,
    /// Percentage price change.
    #[serde(default, deserialize_with = "lenient_f64", rename = "pChange")]
    pub pchange: Option<f64>,
    /// Total bid quantity.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_buy_quantity: Option<f64>,
    /// Total ask quantity.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_sell_quantity: Option<f64>,
}

impl RawOptionChain {
    /// Decodes a JSON body.
    ///
    /// # Errors
    /// Returns `MalformedPayload` if the value does not have the option-chain shape.
    pub fn from_value(value: Value) -> Result<Self, ChainError> {
        serde_json::from_value(value).map_err(|e| ChainError::MalformedPayload(e.to_string()))
    }
}

/// Converts a JSON number or numeric string to an exact decimal.
#[must_use]
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    let decimal = match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    };
    decimal.map(|d| d.normalize())
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(decimal_from_value))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    })
}

/// Parses an expiry date, day first.
///
/// Accepts `25-Jan-2024`, `25-Jan-24`, `25-01-2024` and `25-01-24`.
///
/// # Errors
/// Returns `MalformedPayload` naming the value if no format matches.
pub fn parse_expiry(value: &str) -> Result<NaiveDate, ChainError> {
    let value = value.trim();
    let long_year = value.rsplit('-').next().is_some_and(|year| year.len() == 4);
    let formats: [&str; 2] = if long_year {
        ["%d-%b-%Y", "%d-%m-%Y"]
    } else {
        ["%d-%b-%y", "%d-%m-%y"]
    };
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .ok_or_else(|| ChainError::MalformedPayload(format!("unparseable expiry date `{value}`")))
}

/// Parses the snapshot timestamp (`21-Oct-2022 15:30:00`, two-digit year accepted).
///
/// # Errors
/// Returns `MalformedPayload` naming the value if it does not parse.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, ChainError> {
    let value = value.trim();
    let long_year = value
        .split_whitespace()
        .next()
        .and_then(|date| date.rsplit('-').next())
        .is_some_and(|year| year.len() == 4);
    let format = if long_year {
        "%d-%b-%Y %H:%M:%S"
    } else {
        "%d-%b-%y %H:%M:%S"
    };
    NaiveDateTime::parse_from_str(value, format)
        .map_err(|_| ChainError::MalformedPayload(format!("unparseable timestamp `{value}`")))
}
