//! Error types for option-chain processing.

use chrono::NaiveDate;
use rust_decimal::Decimal;


/// Errors raised while normalizing or filtering option-chain data.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The upstream payload does not have the expected shape.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// `trim` found two strikes equally close to the underlying.
    #[error("Ambiguous middle strike: {lower} and {upper} are equally close to {underlying}")]
    AmbiguousMiddleStrike {
        /// Strike below the underlying.
        lower: Decimal,
        /// Strike above the underlying.
        upper: Decimal,
        /// Underlying value the strikes were compared against.
        underlying: Decimal,
    },

    /// No row carries the requested expiry.
    #[error("Expiry not found: {0}")]
    ExpiryNotFound(NaiveDate),

    /// The operation needs an underlying value and the table has none.
    #[error("Underlying value missing")]
    MissingUnderlying,

    /// The table mixes rows of more than one underlying.
    #[error("Mixed underlyings: {0:?}")]
    MixedUnderlyings(Vec<String>),

    /// The HTTP client failed.
    #[error("Client error: {0}")]
    Client(#[from] nse_client::Error),
}

impl ChainError {
    /// Returns true for payload shape errors.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedPayload(_))
    }
}
