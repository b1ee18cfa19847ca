//! Normalized option table and its filters.

use super::column::{Cell, Column, Metric, Side};
use crate::error::ChainError;
use crate::expiry::ExpiryDates;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;

/// Metrics of one side of a row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SideQuote {
    /// Underlying symbol.
    pub underlying: Option<String>,
    /// Contract identifier.
    pub identifier: Option<String>,
    /// Open interest.
    pub open_interest: Option<f64>,
    /// Change in open interest since the previous session.
    pub change_in_open_interest: Option<f64>,
    /// Percentage change in open interest.
    pub pchange_in_open_interest: Option<f64>,
    /// Traded volume.
    pub total_traded_volume: Option<f64>,
    /// Implied volatility.
    pub implied_volatility: Option<f64>,
    /// Last traded price.
    pub last_price: Option<f64>,
    /// Price change.
    pub change: Option<f64>,
    /// Percentage price change.
    pub pchange: Option<f64>,
    /// Total bid quantity.
    pub total_buy_quantity: Option<f64>,
    /// Total ask quantity.
    pub total_sell_quantity: Option<f64>,
}

impl SideQuote {
    /// Value of a metric.
    #[must_use]
    pub fn get(&self, metric: Metric) -> Cell {
        let text = |value: &Option<String>| value.clone().map_or(Cell::Null, Cell::Text);
        let number = |value: Option<f64>| value.map_or(Cell::Null, Cell::Number);
        match metric {
            Metric::Underlying => text(&self.underlying),
            Metric::Identifier => text(&self.identifier),
            Metric::OpenInterest => number(self.open_interest),
            Metric::ChangeInOpenInterest => number(self.change_in_open_interest),
            Metric::PChangeInOpenInterest => number(self.pchange_in_open_interest),
            Metric::TotalTradedVolume => number(self.total_traded_volume),
            Metric::ImpliedVolatility => number(self.implied_volatility),
            Metric::LastPrice => number(self.last_price),
            Metric::Change => number(self.change),
            Metric::PChange => number(self.pchange),
            Metric::TotalBuyQuantity => number(self.total_buy_quantity),
            Metric::TotalSellQuantity => number(self.total_sell_quantity),
        }
    }
}

/// One (strike, expiry) row. A side absent from the payload is `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionChainRow {
    /// Strike price.
    pub strike_price: Decimal,
    /// Expiry date.
    pub expiry_date: NaiveDate,
    /// Underlying value, from whichever side carried it.
    pub underlying_value: Option<Decimal>,
    /// Call side.
    pub call: Option<SideQuote>,
    /// Put side.
    pub put: Option<SideQuote>,
}

impl OptionChainRow {
    /// Quote of a side.
    #[must_use]
    pub fn side(&self, side: Side) -> Option<&SideQuote> {
        match side {
            Side::Call => self.call.as_ref(),
            Side::Put => self.put.as_ref(),
        }
    }

    /// Value of a column; metrics of an absent side are [`Cell::Null`].
    #[must_use]
    pub fn get(&self, column: Column) -> Cell {
        match column {
            Column::StrikePrice => Cell::Decimal(self.strike_price),
            Column::ExpiryDate => Cell::Date(self.expiry_date),
            Column::UnderlyingValue => self.underlying_value.map_or(Cell::Null, Cell::Decimal),
            Column::Metric(side, metric) => self
                .side(side)
                .map_or(Cell::Null, |quote| quote.get(metric)),
        }
    }

    /// Values in [`Column::all`] order.
    #[must_use]
    pub fn cells(&self) -> Vec<Cell> {
        Column::all().into_iter().map(|c| self.get(c)).collect()
    }
}

/// Strike comparison for [`OptionChainTable::get_by_strike`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrikeCondition {
    /// Strike equals the price.
    Equal,
    /// Strike is strictly above the price.
    Above,
    /// Strike is strictly below the price.
    Below,
}

/// Rows sorted by (expiry, strike) plus the snapshot they came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptionChainTable {
    rows: Vec<OptionChainRow>,
    underlying_value: Option<Decimal>,
    timestamp: Option<NaiveDateTime>,
}

impl OptionChainTable {
    /// Builds a table; rows are sorted by (expiry, strike).
    #[must_use]
    pub fn new(
        mut rows: Vec<OptionChainRow>,
        underlying_value: Option<Decimal>,
        timestamp: Option<NaiveDateTime>,
    ) -> Self {
        rows.sort_by_key(|r| (r.expiry_date, r.strike_price));
        Self {
            rows,
            underlying_value,
            timestamp,
        }
    }

    fn retain(&self, keep: impl Fn(&OptionChainRow) -> bool) -> Self {
        Self {
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
            underlying_value: self.underlying_value,
            timestamp: self.timestamp,
        }
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// Rows in (expiry, strike) order.
    #[must_use]
    pub fn rows(&self) -> &[OptionChainRow] {
        &self.rows
    }

    /// Lazily iterates the rows.
    pub fn iter(&self) -> std::slice::Iter<'_, OptionChainRow> {
        self.rows.iter()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in display order.
    #[must_use]
    pub fn columns(&self) -> Vec<Column> {
        Column::all()
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, column: Column) -> impl Iterator<Item = Cell> + '_ {
        self.rows.iter().map(move |row| row.get(column))
    }

    /// Snapshot time.
    #[must_use]
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }

    /// Snapshot time as `HH:MM:SS`.
    #[must_use]
    pub fn time_string(&self) -> Option<String> {
        self.timestamp.map(|t| t.format("%H:%M:%S").to_string())
    }

    /// Snapshot date as `dd-Mon-yyyy`.
    #[must_use]
    pub fn date_string(&self) -> Option<String> {
        self.timestamp.map(|t| t.format("%d-%b-%Y").to_string())
    }

    /// Underlying price of the snapshot, or of the first row that has one.
    #[must_use]
    pub fn underlying_value(&self) -> Option<Decimal> {
        self.underlying_value
            .or_else(|| self.rows.iter().find_map(|r| r.underlying_value))
    }

    /// Underlying symbol.
    ///
    /// # Errors
    /// Returns `MixedUnderlyings` if rows disagree.
    pub fn symbol(&self) -> Result<Option<String>, ChainError> {
        let symbols: BTreeSet<&str> = self
            .rows
            .iter()
            .flat_map(|r| [r.call.as_ref(), r.put.as_ref()])
            .flatten()
            .filter_map(|q| q.underlying.as_deref())
            .collect();
        match symbols.len() {
            0 => Ok(None),
            1 => Ok(symbols.into_iter().next().map(str::to_string)),
            _ => Err(ChainError::MixedUnderlyings(
                symbols.into_iter().map(str::to_string).collect(),
            )),
        }
    }

    /// Distinct strikes, ascending.
    #[must_use]
    pub fn strike_prices(&self) -> Vec<Decimal> {
        let strikes: BTreeSet<Decimal> = self.rows.iter().map(|r| r.strike_price).collect();
        strikes.into_iter().collect()
    }

    /// Gap between the two lowest strikes.
    #[must_use]
    pub fn strike_interval(&self) -> Option<Decimal> {
        match self.strike_prices().as_slice() {
            [first, second, ..] => Some(*second - *first),
            _ => None,
        }
    }

    /// Distinct expiries.
    #[must_use]
    pub fn expiry_dates(&self) -> ExpiryDates {
        self.rows.iter().map(|r| r.expiry_date).collect()
    }

    /// Sum of a side's open interest; rows without the side count as zero.
    #[must_use]
    pub fn total_open_interest(&self, side: Side) -> f64 {
        self.rows
            .iter()
            .filter_map(|r| r.side(side).and_then(|q| q.open_interest))
            .sum()
    }

    /// Put open interest divided by call open interest.
    #[must_use]
    pub fn put_call_ratio(&self) -> Option<f64> {
        let calls = self.total_open_interest(Side::Call);
        (calls > 0.0).then(|| self.total_open_interest(Side::Put) / calls)
    }

    // ========================================================================
    // Filters
    // ========================================================================

    /// Rows whose strike compares to `price` as requested.
    #[must_use]
    pub fn get_by_strike(&self, price: Decimal, condition: StrikeCondition) -> Self {
        self.retain(|r| match condition {
            StrikeCondition::Equal => r.strike_price == price,
            StrikeCondition::Above => r.strike_price > price,
            StrikeCondition::Below => r.strike_price < price,
        })
    }

    /// Keeps the strike closest to the underlying plus `strikes` strikes on
    /// each side of it, across all expiries.
    ///
    /// # Errors
    /// - `MissingUnderlying` if the table has no underlying value
    /// - `AmbiguousMiddleStrike` if two strikes are equally close
    pub fn trim(&self, strikes: usize) -> Result<Self, ChainError> {
        let underlying = self
            .underlying_value()
            .ok_or(ChainError::MissingUnderlying)?;
        let prices = self.strike_prices();
        let Some(middle) = middle_strike(&prices, underlying)? else {
            return Ok(self.clone());
        };

        let low = middle.saturating_sub(strikes);
        let high = (middle + strikes).min(prices.len() - 1);
        let keep: BTreeSet<Decimal> = prices[low..=high].iter().copied().collect();
        Ok(self.retain(|r| keep.contains(&r.strike_price)))
    }

    /// Rows of one expiry.
    ///
    /// # Errors
    /// Returns `ExpiryNotFound` if no row has that expiry.
    pub fn get_by_expiry(&self, expiry: NaiveDate) -> Result<Self, ChainError> {
        let table = self.retain(|r| r.expiry_date == expiry);
        if table.is_empty() {
            return Err(ChainError::ExpiryNotFound(expiry));
        }
        Ok(table)
    }

    /// Rows whose expiry is one of `expiries`. May be empty.
    #[must_use]
    pub fn get_by_expiries(&self, expiries: &[NaiveDate]) -> Self {
        self.retain(|r| expiries.contains(&r.expiry_date))
    }

    /// Rows of `expiry`, or of the earliest expiry when none match.
    #[must_use]
    pub fn get_by_expiry_or_earliest(&self, expiry: NaiveDate) -> Self {
        match self.get_by_expiry(expiry) {
            Ok(table) => table,
            Err(_) => match self.expiry_dates().first() {
                Some(earliest) => self.retain(|r| r.expiry_date == earliest),
                None => self.clone(),
            },
        }
    }

    fn in_bucket(&self, bucket: &ExpiryDates) -> Self {
        self.retain(|r| bucket.contains(&r.expiry_date))
    }

    /// Rows of the earliest expiry.
    #[must_use]
    pub fn current_expiry(&self) -> Self {
        self.in_bucket(&self.expiry_dates().current_expiry())
    }

    /// Rows expiring in the month of the earliest expiry.
    #[must_use]
    pub fn near_expiry(&self) -> Self {
        self.in_bucket(&self.expiry_dates().near_expiry())
    }

    /// Rows expiring in the month after the near month.
    #[must_use]
    pub fn next_expiry(&self) -> Self {
        self.in_bucket(&self.expiry_dates().next_expiry())
    }

    /// Rows expiring after the next month.
    #[must_use]
    pub fn far_expiry(&self) -> Self {
        self.in_bucket(&self.expiry_dates().far_expiry())
    }

    /// Rows of each month's last expiry.
    #[must_use]
    pub fn monthly_expiry(&self) -> Self {
        self.in_bucket(&self.expiry_dates().monthly_expiry())
    }

    /// Rows of the near-month weekly expiries.
    #[must_use]
    pub fn weekly_expiry(&self) -> Self {
        self.in_bucket(&self.expiry_dates().weekly_expiry())
    }
}

/// Index of the strike closest to `underlying` in ascending `prices`.
fn middle_strike(prices: &[Decimal], underlying: Decimal) -> Result<Option<usize>, ChainError> {
    let mut best: Option<(usize, Decimal)> = None;
    let mut tie: Option<usize> = None;
    for (idx, price) in prices.iter().enumerate() {
        let distance = (*price - underlying).abs();
        match best {
            Some((_, best_distance)) if distance > best_distance => {}
            Some((_, best_distance)) if distance == best_distance => tie = Some(idx),
            _ => {
                best = Some((idx, distance));
                tie = None;
            }
        }
    }
    match (best, tie) {
        (Some((lower, _)), Some(upper)) => Err(ChainError::AmbiguousMiddleStrike {
            lower: prices[lower],
            upper: prices[upper],
            underlying,
        }),
        (best, _) => Ok(best.map(|(idx, _)| idx)),
    }
}

impl<'a> IntoIterator for &'a OptionChainTable {
    type Item = &'a OptionChainRow;
    type IntoIter = std::slice::Iter<'a, OptionChainRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
