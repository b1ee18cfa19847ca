//! Option-chain normalization.
//!
//! The upstream serves a chain as nested entries, each with an optional call
//! (`CE`) and put (`PE`) quote. This module flattens it into an
//! [`OptionChainTable`] with one row per (strike, expiry):
//!
//! ```text
//! records.data[i] ─┬─ CE ──► call records ─┐
//!                  └─ PE ──► put records  ─┴─► outer join on (strike, expiry) ──► rows
//! ```
//!
//! Bid/ask quantities and prices are never carried into the table.

pub mod column;
pub mod normalize;
pub mod payload;
pub mod table;


pub use column::{Cell, Column, Metric, Side};
pub use normalize::{OptionChain, SideRecord, join, normalize};
pub use payload::{RawEntry, RawOptionChain, RawQuote, RawSection, parse_expiry, parse_timestamp};
pub use table::{OptionChainRow, OptionChainTable, SideQuote, StrikeCondition};
