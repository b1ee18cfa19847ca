//! Session-aware HTTP client for the NSE India market-data API.
//!
//! The upstream rejects API calls until the client has visited the home page
//! and collected its cookies, and it intermittently answers with 401, other
//! error statuses or non-JSON bodies. [`NseClient`] hides all of that: every
//! operation bootstraps the session on demand, retries under a
//! [`RetryPolicy`] and returns the decoded JSON body.
//!
//! # Example
//!
//! ```no_run
//! use nse_client::{ClientConfig, NseClient, SymbolKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), nse_client::Error> {
//!     let client = NseClient::new(ClientConfig::default())?;
//!
//!     let chain = client.option_chain("NIFTY", SymbolKind::Index).await?;
//!     println!("{}", chain["records"]["timestamp"]);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod cookies;
mod endpoints;
mod error;
mod executor;
mod headers;
mod request;
mod retry;
mod session;
mod types;

pub use client::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, NseClient};
pub use cookies::{CookieCache, DEFAULT_COOKIE_CACHE};
pub use endpoints::{EXPIRY_PARAM_FORMAT, Endpoints, normalize_symbol};
pub use error::Error;
pub use executor::Executor;
pub use headers::{BrowserHeaders, DEFAULT_USER_AGENT};
pub use request::RequestDescriptor;
pub use retry::{CancelToken, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_INTERVAL, RetryLimit, RetryPolicy};
pub use session::Session;
pub use types::*;
