//! # nse-chain
//!
//! Option-chain toolkit built on the [`nse_client`] HTTP client for the NSE
//! public market-data API.
//!
//! ## Key Features
//!
//! - **Tabular Normalizer**: flattens the nested option-chain payload into a
//!   typed table with one row per (strike, expiry) and a stable column set.
//!
//! - **Expiry Bucketing**: current, near, next, far, monthly and weekly views
//!   over any set of expiry dates, year-aware across December.
//!
//! - **Index Constituents**: stocks and indices of an index listing with their
//!   previous close.
//!
//! - **OI Scraper**: concurrent option-chain snapshots for a symbol list over
//!   one shared session.
//!
//! ## Architecture
//!
//! ```text
//! NseClient::option_chain ──► serde_json::Value
//!                                  │
//!                                  ▼
//!                     OptionChain::from_value        (chain)
//!                      ├── records: OptionChainTable
//!                      └── filtered: OptionChainTable
//!                                  │
//!                                  ▼
//!                 ExpiryDates / table filters        (expiry)
//! ```
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`chain`] | Payload types, normalization and the option-chain table |
//! | [`expiry`] | Expiry date sets and buckets |
//! | [`index`] | Index constituents |
//! | [`scraper`] | OI scraper and per-symbol summaries |
//! | [`config`] | TOML configuration |
//! | [`logging`] | Tracing subscriber setup |
//! | [`error`] | Error types |
//!
//! ## Example Usage
//!
//! ```no_run
//! use nse_chain::chain::{OptionChain, Side};
//! use nse_client::{NseClient, SymbolKind};
//!
//! # async fn run() -> Result<(), nse_chain::ChainError> {
//! let client = NseClient::with_base_url("https://www.nseindia.com")?;
//! let chain = OptionChain::from_value(client.option_chain("NIFTY", SymbolKind::Index).await?)?;
//!
//! let near = chain.records.near_expiry();
//! println!(
//!     "{} rows, call OI {}, PCR {:?}",
//!     near.len(),
//!     near.total_open_interest(Side::Call),
//!     near.put_call_ratio()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Running the Scraper
//!
//! ```bash
//! # Scrape once with defaults (NIFTY, BANKNIFTY)
//! cargo run
//!
//! # With a config file
//! cargo run -- config.toml
//!
//! # Verbose logging
//! RUST_LOG=debug cargo run -- config.toml
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod expiry;
pub mod index;
pub mod logging;
pub mod scraper;

pub use chain::{OptionChain, OptionChainRow, OptionChainTable};
pub use error::ChainError;
pub use expiry::ExpiryDates;
pub use index::IndexConstituents;
pub use scraper::{OiScraper, OiSummary};
