//! Flattens the nested option-chain payload into joined rows.

use super::column::Side;
use super::payload::{RawEntry, RawOptionChain, RawQuote, RawSection, parse_expiry, parse_timestamp};
use super::table::{OptionChainRow, OptionChainTable, SideQuote};
use crate::error::ChainError;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One side of one entry, keyed and ready to join.
#[derive(Debug, Clone, PartialEq)]
pub struct SideRecord {
    /// Strike price.
    pub strike_price: Decimal,
    /// Parsed expiry date.
    pub expiry_date: NaiveDate,
    /// Underlying value of this side, else the section's.
    pub underlying_value: Option<Decimal>,
    /// Metrics of this side.
    pub quote: SideQuote,
}

impl SideRecord {
    fn from_raw(
        entry: &RawEntry,
        raw: &RawQuote,
        fallback_underlying: Option<Decimal>,
    ) -> Result<Self, ChainError> {
        let strike_price = entry
            .strike_price
            .or(raw.strike_price)
            .ok_or_else(|| ChainError::MalformedPayload("entry without strikePrice".to_string()))?;
        let expiry = entry
            .expiry_date
            .as_deref()
            .or(raw.expiry_date.as_deref())
            .ok_or_else(|| {
                ChainError::MalformedPayload(format!("strike {strike_price} without expiryDate"))
            })?;

        Ok(Self {
            strike_price,
            expiry_date: parse_expiry(expiry)?,
            underlying_value: raw.underlying_value.or(fallback_underlying),
            quote: SideQuote {
                underlying: raw.underlying.clone(),
                identifier: raw.identifier.clone(),
                open_interest: raw.open_interest,
                change_in_open_interest: raw.change_in_open_interest,
                pchange_in_open_interest: raw.pchange_in_open_interest,
                total_traded_volume: raw.total_traded_volume,
                implied_volatility: raw.implied_volatility,
                last_price: raw.last_price,
                change: raw.change,
                pchange: raw.pchange,
                total_buy_quantity: raw.total_buy_quantity,
                total_sell_quantity: raw.total_sell_quantity,
            },
        })
    }
}

/// Splits entries into call records and put records, skipping absent sides.
///
/// # Errors
/// Returns `MalformedPayload` if a present side has no strike or an
/// unparseable expiry.
pub fn normalize(
    entries: &[RawEntry],
    fallback_underlying: Option<Decimal>,
) -> Result<(Vec<SideRecord>, Vec<SideRecord>), ChainError> {
    let mut calls = Vec::new();
    let mut puts = Vec::new();
    for entry in entries {
        if let Some(raw) = &entry.call {
            calls.push(SideRecord::from_raw(entry, raw, fallback_underlying)?);
        }
        if let Some(raw) = &entry.put {
            puts.push(SideRecord::from_raw(entry, raw, fallback_underlying)?);
        }
    }
    Ok((calls, puts))
}

/// Full outer join of call and put records on (strike, expiry).
///
/// Every key present on either side yields exactly one row. A duplicate key on
/// the same side keeps the first record.
#[must_use]
pub fn join(calls: Vec<SideRecord>, puts: Vec<SideRecord>) -> Vec<OptionChainRow> {
    let mut rows: BTreeMap<(NaiveDate, Decimal), OptionChainRow> = BTreeMap::new();
    let sides = calls
        .into_iter()
        .map(|r| (Side::Call, r))
        .chain(puts.into_iter().map(|r| (Side::Put, r)));

    for (side, record) in sides {
        let row = rows
            .entry((record.expiry_date, record.strike_price))
            .or_insert_with(|| OptionChainRow {
                strike_price: record.strike_price,
                expiry_date: record.expiry_date,
                underlying_value: None,
                call: None,
                put: None,
            });
        if row.underlying_value.is_none() {
            row.underlying_value = record.underlying_value;
        }
        let slot = match side {
            Side::Call => &mut row.call,
            Side::Put => &mut row.put,
        };
        if slot.is_some() {
            warn!(
                %side,
                strike = %record.strike_price,
                expiry = %record.expiry_date,
                "Duplicate quote ignored"
            );
            continue;
        }
        *slot = Some(record.quote);
    }

    rows.into_values().collect()
}

fn section_table(
    name: &str,
    section: Option<&RawSection>,
    underlying: Option<Decimal>,
    timestamp: Option<NaiveDateTime>,
) -> Result<OptionChainTable, ChainError> {
    let section =
        section.ok_or_else(|| ChainError::MalformedPayload(format!("missing `{name}`")))?;
    let entries = section
        .data
        .as_deref()
        .ok_or_else(|| ChainError::MalformedPayload(format!("missing `{name}.data`")))?;

    let underlying = section.underlying_value.or(underlying);
    let (calls, puts) = normalize(entries, underlying)?;
    debug!(section = name, calls = calls.len(), puts = puts.len(), "Joining chain sides");
    Ok(OptionChainTable::new(join(calls, puts), underlying, timestamp))
}

/// Both tables of one option-chain snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionChain {
    /// All strikes and expiries.
    pub records: OptionChainTable,
    /// The upstream's pre-filtered view (nearest expiry).
    pub filtered: OptionChainTable,
    /// Snapshot time from `records.timestamp`.
    pub timestamp: Option<NaiveDateTime>,
    /// Underlying price from `records.underlyingValue`.
    pub underlying_value: Option<Decimal>,
}

impl OptionChain {
    /// Normalizes a decoded option-chain body.
    ///
    /// # Errors
    /// Returns `MalformedPayload` if `records`, `filtered` or their `data`
    /// is missing, or a date does not parse.
    pub fn from_value(value: Value) -> Result<Self, ChainError> {
        Self::from_raw(&RawOptionChain::from_value(value)?)
    }

    /// Normalizes a typed payload.
    ///
    /// # Errors
    /// See [`OptionChain::from_value`].
    pub fn from_raw(raw: &RawOptionChain) -> Result<Self, ChainError> {
        let records = raw.records.as_ref();
        let timestamp = records
            .and_then(|r| r.timestamp.as_deref())
            .map(parse_timestamp)
            .transpose()?;
        let underlying_value = records.and_then(|r| r.underlying_value);

        Ok(Self {
            records: section_table("records", records, None, timestamp)?,
            filtered: section_table("filtered", raw.filtered.as_ref(), underlying_value, timestamp)?,
            timestamp,
            underlying_value,
        })
    }
}
