//! Index constituents from the `equity-stockIndices` endpoint.

use crate::chain::payload::decimal_from_value;
use crate::error::ChainError;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Known index names and the symbols they trade under.
const INDEX_SYMBOLS: [(&str, &str); 2] = [("NIFTY 50", "NIFTY"), ("NIFTY BANK", "BANKNIFTY")];

/// Symbol an index trades under, e.g. `NIFTY 50` -> `NIFTY`.
#[must_use]
pub fn index_symbol(name: &str) -> Option<&'static str> {
    INDEX_SYMBOLS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, symbol)| *symbol)
}

/// Index name for a traded symbol, e.g. `BANKNIFTY` -> `NIFTY BANK`.
#[must_use]
pub fn index_name(symbol: &str) -> Option<&'static str> {
    INDEX_SYMBOLS
        .iter()
        .find(|(_, s)| *s == symbol)
        .map(|(name, _)| *name)
}

/// Member kind, from the upstream `priority` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// `priority == 0`.
    Stock,
    /// `priority == 1`.
    Index,
}

/// One row of an index constituents listing.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMember {
    /// Trading symbol.
    pub symbol: String,
    /// Listing identifier.
    pub identifier: String,
    /// Index or stock.
    pub kind: MemberKind,
    /// Previous close.
    pub previous_close: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct RawIndexStocks {
    data: Option<Vec<RawMember>>,
    metadata: Option<RawMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    index_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMember {
    symbol: Option<String>,
    identifier: Option<String>,
    priority: Option<u8>,
    #[serde(default)]
    previous_close: Value,
}

/// Stocks and indices accumulated from one or more index listings.
///
/// Members are keyed by identifier, so adding overlapping listings does not
/// duplicate shared stocks.
#[derive(Debug, Clone, Default)]
pub struct IndexConstituents {
    members: BTreeMap<String, IndexMember>,
}

impl IndexConstituents {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges an `index_stocks` body into the set.
    ///
    /// The row whose symbol equals `metadata.indexName` is renamed to the
    /// index's traded symbol when one is known.
    ///
    /// # Errors
    /// Returns `MalformedPayload` if `data` is missing.
    pub fn add(&mut self, value: Value) -> Result<&mut Self, ChainError> {
        let raw: RawIndexStocks = serde_json::from_value(value)
            .map_err(|e| ChainError::MalformedPayload(e.to_string()))?;
        let data = raw
            .data
            .ok_or_else(|| ChainError::MalformedPayload("missing `data`".to_string()))?;
        let name = raw.metadata.and_then(|m| m.index_name);
        let renamed = name.as_deref().and_then(index_symbol);

        let before = self.members.len();
        for member in data {
            let (Some(symbol), Some(identifier)) = (member.symbol, member.identifier) else {
                continue;
            };
            let kind = match member.priority {
                Some(0) => MemberKind::Stock,
                Some(1) => MemberKind::Index,
                _ => continue,
            };
            let symbol = match renamed {
                Some(traded) if name.as_deref() == Some(symbol.as_str()) => traded.to_string(),
                _ => symbol,
            };
            self.members
                .entry(identifier.clone())
                .or_insert_with(|| IndexMember {
                    symbol,
                    identifier,
                    kind,
                    previous_close: decimal_from_value(&member.previous_close),
                });
        }
        debug!(
            index = name.as_deref().unwrap_or("?"),
            added = self.members.len() - before,
            "Index constituents merged"
        );
        Ok(self)
    }

    /// All members ordered by identifier.
    pub fn members(&self) -> impl Iterator<Item = &IndexMember> {
        self.members.values()
    }

    fn symbols_of(&self, kind: MemberKind) -> Vec<String> {
        self.members
            .values()
            .filter(|m| m.kind == kind)
            .map(|m| m.symbol.clone())
            .collect()
    }

    /// Stock symbols ordered by identifier.
    #[must_use]
    pub fn stocks(&self) -> Vec<String> {
        self.symbols_of(MemberKind::Stock)
    }

    /// Index symbols ordered by identifier.
    #[must_use]
    pub fn indices(&self) -> Vec<String> {
        self.symbols_of(MemberKind::Index)
    }

    /// Indices followed by stocks.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        let mut all = self.indices();
        all.extend(self.stocks());
        all
    }

    /// Previous close of `symbol`, if it is a member with a close.
    #[must_use]
    pub fn previous_close(&self, symbol: &str) -> Option<Decimal> {
        self.members
            .values()
            .find(|m| m.symbol == symbol)
            .and_then(|m| m.previous_close)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn nifty() -> Value {
        json!({
            "name": "NIFTY 50",
            "data": [
                {"priority": 1, "symbol": "NIFTY 50", "identifier": "NIFTY 50", "previousClose": 21710.8, "meta": {}},
                {"priority": 0, "symbol": "TCS", "identifier": "TCSEQN", "previousClose": 3880.5, "meta": {"isin": "x"}},
                {"priority": 0, "symbol": "HDFCBANK", "identifier": "HDFCBANKEQN", "previousClose": "1650.10"},
                {"priority": 0, "symbol": "INFY", "identifier": "INFYEQN", "previousClose": "-"}
            ],
            "metadata": {"indexName": "NIFTY 50"}
        })
    }

    fn bank() -> Value {
        json!({
            "data": [
                {"priority": 1, "symbol": "NIFTY BANK", "identifier": "NIFTY BANK", "previousClose": 47450},
                {"priority": 0, "symbol": "HDFCBANK", "identifier": "HDFCBANKEQN", "previousClose": 1650.1},
                {"priority": 0, "symbol": "AXISBANK", "identifier": "AXISBANKEQN", "previousClose": 1100}
            ],
            "metadata": {"indexName": "NIFTY BANK"}
        })
    }

    #[test]
    fn test_index_symbol_mapping() {
        assert_eq!(index_symbol("NIFTY 50"), Some("NIFTY"));
        assert_eq!(index_symbol("NIFTY BANK"), Some("BANKNIFTY"));
        assert_eq!(index_symbol("NIFTY IT"), None);
        assert_eq!(index_name("BANKNIFTY"), Some("NIFTY BANK"));
        assert_eq!(index_name("TCS"), None);
    }

    #[test]
    fn test_add_splits_stocks_and_indices() {
        let mut constituents = IndexConstituents::new();
        constituents.add(nifty()).unwrap();

        assert_eq!(constituents.indices(), vec!["NIFTY"]);
        assert_eq!(constituents.stocks(), vec!["HDFCBANK", "INFY", "TCS"]);
        assert_eq!(constituents.symbols(), vec!["NIFTY", "HDFCBANK", "INFY", "TCS"]);
    }

    #[test]
    fn test_add_merges_overlapping_listings() {
        let mut constituents = IndexConstituents::new();
        constituents.add(nifty()).unwrap().add(bank()).unwrap();

        assert_eq!(constituents.len(), 6);
        assert_eq!(constituents.indices(), vec!["NIFTY", "BANKNIFTY"]);
        assert_eq!(
            constituents.stocks(),
            vec!["AXISBANK", "HDFCBANK", "INFY", "TCS"]
        );
    }

    #[test]
    fn test_previous_close() {
        let mut constituents = IndexConstituents::new();
        constituents.add(nifty()).unwrap();

        assert_eq!(constituents.previous_close("NIFTY"), Some(dec!(21710.8)));
        assert_eq!(constituents.previous_close("HDFCBANK"), Some(dec!(1650.1)));
        assert_eq!(constituents.previous_close("INFY"), None);
        assert_eq!(constituents.previous_close("WIPRO"), None);
    }

    #[test]
    fn test_add_requires_data() {
        let mut constituents = IndexConstituents::new();
        let err = constituents.add(json!({"metadata": {}})).unwrap_err();
        assert!(err.is_malformed());
        assert!(constituents.is_empty());
    }
}
