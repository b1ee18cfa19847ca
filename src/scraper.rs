//! Open-interest scraper.
//!
//! Fetches the option chain of every configured symbol concurrently over one
//! shared [`NseClient`] and keeps the latest normalized snapshot per symbol.

use crate::chain::{OptionChain, Side};
use crate::error::ChainError;
use chrono::{NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use futures::future::join_all;
use nse_client::{NseClient, SymbolKind, normalize_symbol};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Per-symbol figures logged after each round.
///
/// Open interest and the put-call ratio are taken over the nearest expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct OiSummary {
    /// Normalized symbol.
    pub symbol: String,
    /// Snapshot timestamp.
    pub timestamp: Option<NaiveDateTime>,
    /// Underlying value.
    pub underlying_value: Option<Decimal>,
    /// Rows in the full `records` table.
    pub rows: usize,
    /// Nearest expiry in the snapshot.
    pub nearest_expiry: Option<NaiveDate>,
    /// Total call open interest.
    pub call_oi: f64,
    /// Total put open interest.
    pub put_oi: f64,
    /// Put OI over call OI; `None` when call OI is zero.
    pub put_call_ratio: Option<f64>,
}

impl OiSummary {
    /// Summarizes one snapshot.
    #[must_use]
    pub fn from_chain(symbol: &str, chain: &OptionChain) -> Self {
        let nearest = chain.records.current_expiry();
        Self {
            symbol: symbol.to_string(),
            timestamp: chain.timestamp,
            underlying_value: chain.underlying_value,
            rows: chain.records.len(),
            nearest_expiry: chain.records.expiry_dates().first(),
            call_oi: nearest.total_open_interest(Side::Call),
            put_oi: nearest.total_open_interest(Side::Put),
            put_call_ratio: nearest.put_call_ratio(),
        }
    }
}

/// Option-chain scraper over a fixed symbol list.
#[derive(Debug, Clone)]
pub struct OiScraper {
    client: NseClient,
    targets: Arc<Vec<(String, SymbolKind)>>,
    snapshots: Arc<DashMap<String, OptionChain>>,
}

impl OiScraper {
    /// Creates a scraper. Symbols are upper-cased; empty ones are rejected.
    ///
    /// # Errors
    /// Returns `Client(InvalidArgument)` for an empty symbol.
    pub fn new(
        client: NseClient,
        targets: impl IntoIterator<Item = (String, SymbolKind)>,
    ) -> Result<Self, ChainError> {
        let targets = targets
            .into_iter()
            .map(|(symbol, kind)| normalize_symbol(&symbol).map(|symbol| (symbol, kind)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            client,
            targets: Arc::new(targets),
            snapshots: Arc::new(DashMap::new()),
        })
    }

    /// Configured symbols in order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|(symbol, _)| symbol.as_str())
    }

    /// Fetches and normalizes one chain, replacing its stored snapshot.
    ///
    /// # Errors
    /// Returns `Client` if the request fails or `MalformedPayload` if the
    /// body cannot be normalized. The previous snapshot is kept on error.
    pub async fn scrape(&self, symbol: &str, kind: SymbolKind) -> Result<OiSummary, ChainError> {
        let symbol = normalize_symbol(symbol)?;
        let value = self.client.option_chain(&symbol, kind).await?;
        let chain = OptionChain::from_value(value)?;
        let summary = OiSummary::from_chain(&symbol, &chain);
        self.snapshots.insert(symbol, chain);
        Ok(summary)
    }

    /// Scrapes every configured symbol concurrently.
    ///
    /// Results come back in configuration order.
    pub async fn scrape_all(&self) -> Vec<(String, Result<OiSummary, ChainError>)> {
        let rounds = self.targets.iter().map(|(symbol, kind)| async move {
            (symbol.clone(), self.scrape(symbol, *kind).await)
        });
        join_all(rounds).await
    }

    /// Latest snapshot of `symbol`.
    #[must_use]
    pub fn latest(&self, symbol: &str) -> Option<OptionChain> {
        let symbol = normalize_symbol(symbol).ok()?;
        self.snapshots.get(&symbol).map(|entry| entry.value().clone())
    }

    /// Summaries of all stored snapshots, in configuration order.
    #[must_use]
    pub fn summaries(&self) -> Vec<OiSummary> {
        self.symbols()
            .filter_map(|symbol| {
                self.snapshots
                    .get(symbol)
                    .map(|entry| OiSummary::from_chain(symbol, entry.value()))
            })
            .collect()
    }

    /// Runs one round, or rounds every `interval` until the client's cancel
    /// token fires.
    ///
    /// Returns the number of rounds completed.
    pub async fn run(&self, interval: Option<Duration>) -> usize {
        let cancel = self.client.cancel_token();
        let mut rounds = 0;
        loop {
            for (symbol, result) in self.scrape_all().await {
                match result {
                    Ok(summary) => log_summary(&summary),
                    Err(e) => warn!(%symbol, error = %e, "Scrape failed"),
                }
            }
            rounds += 1;

            let Some(interval) = interval else {
                return rounds;
            };
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return rounds,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }
}

fn log_summary(summary: &OiSummary) {
    info!(
        symbol = %summary.symbol,
        underlying = ?summary.underlying_value,
        rows = summary.rows,
        nearest_expiry = ?summary.nearest_expiry,
        call_oi = summary.call_oi,
        put_oi = summary.put_oi,
        pcr = ?summary.put_call_ratio,
        "Option chain scraped"
    );
}
