//! Error types for the NSE client.

use thiserror::Error;


/// Client error types.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied argument is outside its allowed domain.
    ///
    /// Raised before any network I/O and never retried.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Upstream answered 401; the session was dropped and rebuilt.
    #[error("Session expired (401) on `{0}`")]
    AuthExpired(String),

    /// The retry policy ran out of attempts.
    #[error(
        "Request `{name}` failed after {attempts} attempts: max_retry_exhausted (last status: {}, last error: {})",
        display_status(.last_status),
        .last_error.as_deref().unwrap_or("none")
    )]
    RequestFailure {
        /// Logical request name.
        name: String,
        /// Number of attempts made.
        attempts: u32,
        /// Last HTTP status observed, if any response arrived.
        last_status: Option<u16>,
        /// Last transport or decode error observed.
        last_error: Option<String>,
    },

    /// A transport failure that retrying cannot fix (DNS, connect, timeout).
    #[error("Transport error on `{name}`: {source}")]
    Transport {
        /// Logical request name.
        name: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The client's cancel token fired while the request was in flight.
    #[error("Request `{0}` cancelled")]
    Cancelled(String),

    /// The overall deadline of the retry policy elapsed.
    #[error("Request `{0}` exceeded its deadline")]
    DeadlineExceeded(String),

    /// HTTP client construction failed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Reading or writing the cookie cache failed.
    #[error("Cookie cache error: {0}")]
    CookieCache(String),
}

fn display_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

impl Error {
    /// Returns true when the error was produced by argument validation.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Returns the last HTTP status for exhausted requests.
    #[must_use]
    pub fn last_status(&self) -> Option<u16> {
        match self {
            Self::RequestFailure { last_status, .. } => *last_status,
            _ => None,
        }
    }
}
