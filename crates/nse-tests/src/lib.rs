//! Integration test support for the NSE client.
//!
//! [`FakeUpstream`] is an in-process axum server standing in for the NSE site:
//! `/` hands out a session cookie, and every other path answers from a
//! per-path script of [`Reply`] values. Tests drive a real [`NseClient`] at it
//! and inspect hit counters and the last request it saw.

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use nse_client::{BrowserHeaders, ClientConfig, NseClient, RetryPolicy};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Option chain path for indices.
pub const OPTION_CHAIN_INDICES: &str = "/api/option-chain-indices";
/// Option chain path for equities.
pub const OPTION_CHAIN_EQUITIES: &str = "/api/option-chain-equities";
/// Index constituents path.
pub const INDEX_STOCKS: &str = "/api/equity-stockIndices";
/// Market status path.
pub const MARKET_STATUS: &str = "/api/marketStatus";
/// Equity history path.
pub const HISTORY_EQUITY: &str = "/api/historical/cm/equity";
/// Name of the session cookie set by `/`.
pub const SESSION_COOKIE: &str = "nsit";

/// One scripted response.
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    body: String,
    delay: Duration,
}

impl Reply {
    /// 200 with a JSON body.
    #[must_use]
    pub fn json(value: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: value.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// 200 with a body that is not JSON.
    #[must_use]
    pub fn text(body: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Bare status code with an empty body.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: String::new(),
            delay: Duration::ZERO,
        }
    }

    /// Holds the response back for `delay`.
    #[must_use]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn respond(self) -> Response {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response()
    }
}

#[derive(Debug)]
struct Upstream {
    queues: Mutex<HashMap<String, VecDeque<Reply>>>,
    defaults: Mutex<HashMap<String, Reply>>,
    home_status: Mutex<StatusCode>,
    home_delay: Mutex<Duration>,
    home_hits: AtomicUsize,
    api_hits: Mutex<HashMap<String, usize>>,
    require_cookie: AtomicBool,
    /// Sessions numbered below this are rejected with 401.
    valid_from: AtomicUsize,
    last_query: Mutex<Option<String>>,
    last_cookie: Mutex<Option<String>>,
}

impl Default for Upstream {
    fn default() -> Self {
        Self {
            queues: Mutex::default(),
            defaults: Mutex::default(),
            home_status: Mutex::new(StatusCode::OK),
            home_delay: Mutex::new(Duration::ZERO),
            home_hits: AtomicUsize::new(0),
            api_hits: Mutex::default(),
            require_cookie: AtomicBool::new(false),
            valid_from: AtomicUsize::new(0),
            last_query: Mutex::default(),
            last_cookie: Mutex::default(),
        }
    }
}

/// Session number carried by a `Cookie` header, e.g. `nsit=session-3`.
fn session_number(cookie: &str) -> Option<usize> {
    cookie
        .split("; ")
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| value.strip_prefix("session-"))
        .and_then(|n| n.parse().ok())
}

impl Upstream {
    fn session_valid(&self, cookie: Option<&str>) -> bool {
        cookie
            .and_then(session_number)
            .is_some_and(|n| n >= self.valid_from.load(Ordering::SeqCst))
    }
}

async fn home(State(upstream): State<Arc<Upstream>>) -> Response {
    let session = upstream.home_hits.fetch_add(1, Ordering::SeqCst) + 1;
    let delay = *upstream.home_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let status = *upstream.home_status.lock();
    if status != StatusCode::OK {
        return status.into_response();
    }

    let mut response = (StatusCode::OK, "<html>NSE</html>").into_response();
    let cookies = [
        format!("{SESSION_COOKIE}=session-{session}; Path=/"),
        "bm_sv=fake; Path=/; HttpOnly".to_string(),
    ];
    for cookie in cookies {
        if let Ok(value) = HeaderValue::try_from(cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

async fn api(State(upstream): State<Arc<Upstream>>, uri: Uri, headers: HeaderMap) -> Response {
    let path = uri.path().to_string();
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    *upstream.last_query.lock() = uri.query().map(str::to_string);
    *upstream.last_cookie.lock() = cookie.clone();
    *upstream.api_hits.lock().entry(path.clone()).or_default() += 1;

    if upstream.require_cookie.load(Ordering::SeqCst) && !upstream.session_valid(cookie.as_deref())
    {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let scripted = upstream
        .queues
        .lock()
        .get_mut(&path)
        .and_then(VecDeque::pop_front);
    let reply = scripted.or_else(|| upstream.defaults.lock().get(&path).cloned());
    match reply {
        Some(reply) => reply.respond().await,
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// In-process stand-in for the NSE site.
///
/// The server task is aborted on drop.
#[derive(Debug)]
pub struct FakeUpstream {
    addr: SocketAddr,
    state: Arc<Upstream>,
    server: JoinHandle<()>,
}

impl FakeUpstream {
    /// Binds an ephemeral localhost port and starts serving.
    ///
    /// # Errors
    /// Returns error if the port cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Upstream::default());
        let router = Router::new()
            .route("/", get(home))
            .route("/{*path}", get(api))
            .with_state(Arc::clone(&state));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// Site root, e.g. `http://127.0.0.1:41234`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queues `reply` as the next answer for `path`.
    pub fn push(&self, path: &str, reply: Reply) -> &Self {
        self.state
            .queues
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Answer for `path` once its queue is empty.
    pub fn set_default(&self, path: &str, reply: Reply) -> &Self {
        self.state.defaults.lock().insert(path.to_string(), reply);
        self
    }

    /// Status the home page answers with.
    pub fn set_home_status(&self, status: u16) -> &Self {
        *self.state.home_status.lock() =
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self
    }

    /// Delay before the home page answers.
    pub fn set_home_delay(&self, delay: Duration) -> &Self {
        *self.state.home_delay.lock() = delay;
        self
    }

    /// Rejects API calls with 401 unless they carry a live session cookie.
    pub fn require_cookie(&self, required: bool) -> &Self {
        self.state.require_cookie.store(required, Ordering::SeqCst);
        self
    }

    /// Expires every session handed out so far.
    pub fn expire_sessions(&self) -> &Self {
        let next = self.state.home_hits.load(Ordering::SeqCst) + 1;
        self.state.valid_from.store(next, Ordering::SeqCst);
        self
    }

    /// Number of home page visits.
    #[must_use]
    pub fn home_hits(&self) -> usize {
        self.state.home_hits.load(Ordering::SeqCst)
    }

    /// Number of requests to `path`.
    #[must_use]
    pub fn api_hits(&self, path: &str) -> usize {
        self.state.api_hits.lock().get(path).copied().unwrap_or(0)
    }

    /// Number of requests to any API path.
    #[must_use]
    pub fn total_api_hits(&self) -> usize {
        self.state.api_hits.lock().values().sum()
    }

    /// Raw query string of the last API request.
    #[must_use]
    pub fn last_query(&self) -> Option<String> {
        self.state.last_query.lock().clone()
    }

    /// `Cookie` header of the last API request.
    #[must_use]
    pub fn last_cookie(&self) -> Option<String> {
        self.state.last_cookie.lock().clone()
    }
}

impl Drop for FakeUpstream {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Client configuration aimed at `upstream` with short timeouts and a 10 ms
/// retry interval.
#[must_use]
pub fn client_config(upstream: &FakeUpstream, retry: RetryPolicy) -> ClientConfig {
    ClientConfig {
        base_url: upstream.base_url(),
        timeout: Duration::from_secs(2),
        retry: retry.with_interval(Duration::from_millis(10)),
        headers: BrowserHeaders::default(),
        cookie_cache: None,
    }
}

/// Creates a test client with the default attempt limit.
///
/// # Errors
/// Returns error if client creation fails.
pub fn create_test_client(upstream: &FakeUpstream) -> Result<NseClient, nse_client::Error> {
    NseClient::new(client_config(upstream, RetryPolicy::default()))
}

/// Generates a unique temp file path to avoid conflicts between tests.
#[must_use]
pub fn unique_path(prefix: &str) -> PathBuf {
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

    std::env::temp_dir()
        .join(format!("{}_{}_{}_{}", prefix, std::process::id(), ts, counter))
        .join("cookies.json")
}

fn quote(symbol: &str, strike: u32, expiry: &str, oi: u32, ltp: f64) -> Value {
    json!({
        "strikePrice": strike,
        "expiryDate": expiry,
        "underlying": symbol,
        "identifier": format!("OPTIDX{symbol}{expiry}{strike}"),
        "openInterest": oi,
        "changeinOpenInterest": 10,
        "pchangeinOpenInterest": 1.5,
        "totalTradedVolume": 1200,
        "impliedVolatility": 14.2,
        "lastPrice": ltp,
        "change": -2.5,
        "pChange": -1.1,
        "totalBuyQuantity": 5000,
        "totalSellQuantity": 4200,
        "bidQty": 50,
        "bidprice": ltp - 0.5,
        "askQty": 75,
        "askPrice": ltp + 0.5,
        "underlyingValue": 17500.5
    })
}

/// Option chain body for `symbol`: three strikes on 27-Oct-2022 (outer ones
/// one-sided) and one two-sided strike on 24-Nov-2022.
#[must_use]
pub fn option_chain_payload(symbol: &str) -> Value {
    let near = "27-Oct-2022";
    let far = "24-Nov-2022";
    let near_rows = json!([
        {"strikePrice": 17400, "expiryDate": near, "CE": quote(symbol, 17400, near, 100, 180.0)},
        {"strikePrice": 17500, "expiryDate": near,
            "CE": quote(symbol, 17500, near, 200, 110.0),
            "PE": quote(symbol, 17500, near, 300, 105.0)},
        {"strikePrice": 17600, "expiryDate": near, "PE": quote(symbol, 17600, near, 500, 150.0)}
    ]);
    let mut all_rows = near_rows.clone();
    if let Value::Array(rows) = &mut all_rows {
        rows.push(json!({"strikePrice": 17500, "expiryDate": far,
            "CE": quote(symbol, 17500, far, 1000, 300.0),
            "PE": quote(symbol, 17500, far, 900, 280.0)}));
    }

    json!({
        "records": {
            "expiryDates": [near, far],
            "data": all_rows,
            "timestamp": "21-Oct-2022 15:30:00",
            "underlyingValue": 17500.5,
            "strikePrices": [17400, 17500, 17600]
        },
        "filtered": {
            "data": near_rows,
            "CE": {"totOI": 300, "totVol": 2400},
            "PE": {"totOI": 800, "totVol": 2400}
        }
    })
}

/// `equity-stockIndices` body for NIFTY 50 with three constituents.
#[must_use]
pub fn index_stocks_payload() -> Value {
    json!({
        "name": "NIFTY 50",
        "data": [
            {"priority": 1, "symbol": "NIFTY 50", "identifier": "NIFTY 50", "previousClose": 17563.95, "meta": {}},
            {"priority": 0, "symbol": "RELIANCE", "identifier": "RELIANCEEQN", "previousClose": 2480.4, "meta": {}},
            {"priority": 0, "symbol": "INFY", "identifier": "INFYEQN", "previousClose": 1490.05, "meta": {}},
            {"priority": 0, "symbol": "HDFCBANK", "identifier": "HDFCBANKEQN", "previousClose": 1450.0, "meta": {}}
        ],
        "metadata": {"indexName": "NIFTY 50", "timeVal": "21-Oct-2022 16:00:00"}
    })
}
