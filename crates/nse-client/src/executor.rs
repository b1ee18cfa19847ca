//! Retrying request executor.

use crate::error::Error;
use crate::request::RequestDescriptor;
use crate::retry::{CancelToken, RetryPolicy};
use crate::session::Session;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Outcome of a single GET.
enum Attempt {
    Success(Value),
    InvalidBody(String),
    Unauthorized,
    Status(u16),
    Transport(reqwest::Error),
}

/// Connect failures and timeouts abort the request instead of retrying.
fn is_fatal(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

/// Issues requests under a retry policy, keeping the session alive.
#[derive(Debug, Clone)]
pub struct Executor {
    http: Client,
    session: Arc<Session>,
    policy: RetryPolicy,
    cancel: CancelToken,
}

impl Executor {
    pub(crate) fn new(
        http: Client,
        session: Arc<Session>,
        policy: RetryPolicy,
        cancel: CancelToken,
    ) -> Self {
        Self {
            http,
            session,
            policy,
            cancel,
        }
    }

    /// Retry policy in effect.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `request` to completion and returns the decoded JSON body.
    ///
    /// # Errors
    /// - `Transport` on connect failures and timeouts
    /// - `RequestFailure` once a finite policy runs out of attempts
    /// - `Cancelled` if the client's cancel token fires
    /// - `DeadlineExceeded` if the policy deadline elapses
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<Value, Error> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled(request.name().to_string()));
        }
        match self.policy.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.run(request))
                .await
                .map_err(|_| Error::DeadlineExceeded(request.name().to_string()))?,
            None => self.run(request).await,
        }
    }

    async fn run(&self, request: &RequestDescriptor) -> Result<Value, Error> {
        let name = request.name();
        let url = request.full_url()?;

        let mut generation = self.session.ensure().await;
        if generation.is_none() {
            warn!(request = name, "Proceeding without a bootstrapped session");
        }

        let mut attempts: u32 = 0;
        let mut last_status = None;
        let mut last_error = None;

        loop {
            attempts += 1;
            debug!(request = name, attempt = attempts, url = %url, "Sending request");

            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    return Err(Error::Cancelled(name.to_string()));
                }
                outcome = self.attempt(&url, request) => outcome,
            };

            // Whether the next attempt needs a pause and a fresh session.
            let (pause, rebootstrap) = match outcome {
                Attempt::Success(body) => {
                    debug!(request = name, attempt = attempts, "Request succeeded");
                    return Ok(body);
                }
                Attempt::InvalidBody(e) => {
                    warn!(request = name, attempt = attempts, error = %e, "Response is not valid JSON");
                    last_status = Some(StatusCode::OK.as_u16());
                    last_error = Some(e);
                    (true, false)
                }
                Attempt::Unauthorized => {
                    warn!(request = name, attempt = attempts, "Session rejected with 401");
                    last_status = Some(StatusCode::UNAUTHORIZED.as_u16());
                    last_error = Some(Error::AuthExpired(name.to_string()).to_string());
                    (false, true)
                }
                Attempt::Status(status) => {
                    warn!(request = name, attempt = attempts, status, "Unexpected status");
                    last_status = Some(status);
                    (true, false)
                }
                Attempt::Transport(e) if is_fatal(&e) => {
                    return Err(Error::Transport {
                        name: name.to_string(),
                        source: e,
                    });
                }
                Attempt::Transport(e) => {
                    warn!(request = name, attempt = attempts, error = %e, "Transport error");
                    last_error = Some(e.to_string());
                    (true, true)
                }
            };

            if !self.policy.allows(attempts + 1) {
                warn!(request = name, attempts, "Maximum retry exhausted");
                return Err(Error::RequestFailure {
                    name: name.to_string(),
                    attempts,
                    last_status,
                    last_error,
                });
            }

            if pause {
                self.pause(name).await?;
            }
            if rebootstrap {
                if let Some(stale) = generation {
                    self.session.invalidate(stale);
                }
                generation = self.session.refresh(generation).await;
            }
        }
    }

    async fn attempt(&self, url: &Url, request: &RequestDescriptor) -> Attempt {
        let response = match self
            .http
            .get(url.clone())
            .timeout(request.timeout())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Attempt::Transport(e),
        };

        match response.status() {
            StatusCode::OK => match response.bytes().await {
                Ok(body) => match serde_json::from_slice(&body) {
                    Ok(value) => Attempt::Success(value),
                    Err(e) => Attempt::InvalidBody(e.to_string()),
                },
                Err(e) => Attempt::Transport(e),
            },
            StatusCode::UNAUTHORIZED => Attempt::Unauthorized,
            status => Attempt::Status(status.as_u16()),
        }
    }

    async fn pause(&self, name: &str) -> Result<(), Error> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled(name.to_string())),
            () = tokio::time::sleep(self.policy.interval) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_error_is_fatal() {
        let client = Client::new();
        // Port 9 on localhost is the discard service and is closed on CI hosts.
        let err = client
            .get("http://127.0.0.1:9/")
            .timeout(std::time::Duration::from_secs(2))
            .send()
            .await
            .unwrap_err();
        assert!(is_fatal(&err));
    }

    #[tokio::test]
    async fn test_builder_error_is_not_fatal() {
        let client = Client::new();
        let err = client.get("http://[::1").send().await.unwrap_err();
        assert!(!is_fatal(&err));
    }
}
