//! Cookie session against the NSE home page.
//!
//! The API answers 401 until the client has visited the home page and picked
//! up its cookies. `Session` owns that handshake, its generation counter and
//! the optional on-disk cookie cache.

use crate::cookies::CookieCache;
use parking_lot::Mutex;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;


/// Bootstrap flag plus the generation that produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SessionState {
    bootstrapped: bool,
    generation: u64,
}

impl SessionState {
    /// Current generation if the session is usable.
    pub(crate) fn current(&self) -> Option<u64> {
        self.bootstrapped.then_some(self.generation)
    }

    /// Marks the session bootstrapped. The generation only moves on a
    /// false to true transition.
    pub(crate) fn mark_bootstrapped(&mut self) -> bool {
        if self.bootstrapped {
            return false;
        }
        self.bootstrapped = true;
        self.generation += 1;
        true
    }

    /// Clears the flag only if `generation` is still current.
    pub(crate) fn invalidate(&mut self, generation: u64) -> bool {
        if self.bootstrapped && self.generation == generation {
            self.bootstrapped = false;
            true
        } else {
            false
        }
    }
}

/// Session bootstrapper shared by all requests of a client.
#[derive(Debug)]
pub struct Session {
    http: Client,
    jar: Arc<Jar>,
    home: Url,
    timeout: Duration,
    cache: Option<CookieCache>,
    state: Mutex<SessionState>,
    gate: tokio::sync::Mutex<()>,
}

impl Session {
    /// Creates a session. Cookies found in `cache` are loaded into `jar` and
    /// the session starts bootstrapped.
    pub(crate) fn new(
        http: Client,
        jar: Arc<Jar>,
        home: Url,
        timeout: Duration,
        cache: Option<CookieCache>,
    ) -> Self {
        let session = Self {
            http,
            jar,
            home,
            timeout,
            cache,
            state: Mutex::new(SessionState::default()),
            gate: tokio::sync::Mutex::new(()),
        };
        session.restore_cookies();
        session
    }

    fn restore_cookies(&self) {
        let Some(cache) = &self.cache else {
            return;
        };
        match cache.load() {
            Ok((cookies, _)) if cookies.is_empty() => {
                debug!(path = %cache.path().display(), "Cookie cache is empty");
            }
            Ok((cookies, saved_at)) => {
                for cookie in &cookies {
                    self.jar.add_cookie_str(cookie, &self.home);
                }
                self.state.lock().mark_bootstrapped();
                info!(
                    count = cookies.len(),
                    %saved_at,
                    "Restored session cookies from cache"
                );
            }
            Err(e) => debug!(error = %e, "No usable cookie cache"),
        }
    }

    fn persist_cookies(&self) {
        let Some(cache) = &self.cache else {
            return;
        };
        let Some(header) = self.jar.cookies(&self.home) else {
            return;
        };
        let cookies: Vec<String> = match header.to_str() {
            Ok(value) => value.split("; ").map(str::to_string).collect(),
            Err(e) => {
                warn!(error = %e, "Session cookies are not valid text");
                return;
            }
        };
        if let Err(e) = cache.store(&cookies) {
            warn!(error = %e, "Failed to write cookie cache");
        }
    }

    /// Home page URL.
    #[must_use]
    pub fn home_url(&self) -> &Url {
        &self.home
    }

    /// Returns true if the session holds usable cookies.
    #[must_use]
    pub fn is_bootstrapped(&self) -> bool {
        self.state.lock().bootstrapped
    }

    /// Number of successful false to true transitions so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Current generation if bootstrapped.
    #[must_use]
    pub fn current(&self) -> Option<u64> {
        self.state.lock().current()
    }

    /// Visits the home page and records the outcome.
    ///
    /// Safe to call while bootstrapped: it re-verifies, and the generation does
    /// not move. Concurrent callers are serialised.
    pub async fn bootstrap(&self) -> bool {
        let _gate = self.gate.lock().await;
        self.bootstrap_locked().await
    }

    async fn bootstrap_locked(&self) -> bool {
        debug!(url = %self.home, "Bootstrapping session");
        let response = self
            .http
            .get(self.home.clone())
            .timeout(self.timeout)
            .send()
            .await;
        match response {
            Ok(resp) if resp.status() == StatusCode::OK => {
                let transitioned = self.state.lock().mark_bootstrapped();
                info!(generation = self.generation(), transitioned, "Session bootstrapped");
                self.persist_cookies();
                true
            }
            Ok(resp) => {
                error!(status = resp.status().as_u16(), "Session bootstrap rejected");
                false
            }
            Err(e) => {
                error!(error = %e, "Session bootstrap failed");
                false
            }
        }
    }

    /// Returns the current generation, bootstrapping first if needed.
    ///
    /// Callers that find the session down queue on the gate; only the first
    /// one reaches the network.
    pub async fn ensure(&self) -> Option<u64> {
        if let Some(generation) = self.current() {
            return Some(generation);
        }
        let _gate = self.gate.lock().await;
        if let Some(generation) = self.current() {
            return Some(generation);
        }
        if self.bootstrap_locked().await {
            self.current()
        } else {
            None
        }
    }

    /// Drops the session if `generation` is still the live one.
    ///
    /// Returns false when someone already refreshed it.
    pub fn invalidate(&self, generation: u64) -> bool {
        let cleared = self.state.lock().invalidate(generation);
        if cleared {
            debug!(generation, "Session invalidated");
        }
        cleared
    }

    /// Re-bootstraps after the session seen as `stale` stopped working.
    ///
    /// If another request has already replaced that session, its generation is
    /// returned without a network call.
    pub async fn refresh(&self, stale: Option<u64>) -> Option<u64> {
        let _gate = self.gate.lock().await;
        match self.current() {
            Some(current) if Some(current) != stale => {
                debug!(current, "Session already refreshed");
                Some(current)
            }
            _ => {
                if self.bootstrap_locked().await {
                    self.current()
                } else {
                    None
                }
            }
        }
    }
}
