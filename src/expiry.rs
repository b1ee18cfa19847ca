//! Expiry date sets and their proximity buckets.
//!
//! Months are compared on a year-aware index (`year * 12 + month`), so a
//! December near month is followed by January of the next year.

use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};


fn month_index(date: &NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

/// Deduplicated, sorted set of expiry dates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpiryDates(BTreeSet<NaiveDate>);

impl FromIterator<NaiveDate> for ExpiryDates {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl ExpiryDates {
    /// Builds a set from any collection of dates.
    #[must_use]
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        dates.into_iter().collect()
    }

    /// Dates in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &NaiveDate> {
        self.0.iter()
    }

    /// Dates in ascending order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<NaiveDate> {
        self.0.iter().copied().collect()
    }

    /// Number of distinct dates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if `date` is in the set.
    #[must_use]
    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.0.contains(date)
    }

    /// Earliest date.
    #[must_use]
    pub fn first(&self) -> Option<NaiveDate> {
        self.0.first().copied()
    }

    /// Latest date.
    #[must_use]
    pub fn last(&self) -> Option<NaiveDate> {
        self.0.last().copied()
    }

    fn select(&self, keep: impl Fn(i32, i32) -> bool) -> Self {
        let Some(near) = self.first().map(|d| month_index(&d)) else {
            return Self::default();
        };
        self.0
            .iter()
            .copied()
            .filter(|d| keep(month_index(d), near))
            .collect()
    }

    /// The single earliest date.
    #[must_use]
    pub fn current_expiry(&self) -> Self {
        self.first().into_iter().collect()
    }

    /// Dates in the month of the earliest date.
    #[must_use]
    pub fn near_expiry(&self) -> Self {
        self.select(|month, near| month == near)
    }

    /// Dates in the month after the near month.
    #[must_use]
    pub fn next_expiry(&self) -> Self {
        self.select(|month, near| month == near + 1)
    }

    /// Dates beyond the next month.
    #[must_use]
    pub fn far_expiry(&self) -> Self {
        self.select(|month, near| month > near + 1)
    }

    /// Last date of every month present.
    #[must_use]
    pub fn monthly_expiry(&self) -> Self {
        let mut last_by_month = BTreeMap::new();
        for date in &self.0 {
            last_by_month.insert(month_index(date), *date);
        }
        last_by_month.into_values().collect()
    }

    /// Near-month dates except the last one, which is the monthly expiry.
    #[must_use]
    pub fn weekly_expiry(&self) -> Self {
        let mut near = self.near_expiry();
        near.0.pop_last();
        near
    }
}

impl<'a> IntoIterator for &'a ExpiryDates {
    type Item = &'a NaiveDate;
    type IntoIter = std::collections::btree_set::Iter<'a, NaiveDate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
