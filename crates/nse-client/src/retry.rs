//! Retry policy and cancellation for the request executor.

use crate::error::Error;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Default number of attempts per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default fixed pause between attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// How many attempts a request may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
    /// At most this many attempts.
    Attempts(NonZeroU32),
    /// Retry until success, a fatal error, cancellation or the deadline.
    Unlimited,
}

/// Retry configuration for the executor.
///
/// The pause between attempts is fixed, not exponential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempt limit.
    pub limit: RetryLimit,
    /// Pause before the next attempt after a retryable failure.
    pub interval: Duration,
    /// Optional overall budget for one logical request, retries included.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            limit: RetryLimit::Attempts(
                NonZeroU32::new(DEFAULT_MAX_ATTEMPTS).unwrap_or(NonZeroU32::MIN),
            ),
            interval: DEFAULT_RETRY_INTERVAL,
            deadline: None,
        }
    }
}

impl RetryPolicy {
    /// Policy allowing at most `max_attempts` attempts.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for zero; use [`RetryPolicy::unlimited`] instead.
    pub fn limited(max_attempts: u32) -> Result<Self, Error> {
        let attempts = NonZeroU32::new(max_attempts).ok_or_else(|| {
            Error::InvalidArgument(
                "max_attempts must be positive; use RetryPolicy::unlimited()".to_string(),
            )
        })?;
        Ok(Self {
            limit: RetryLimit::Attempts(attempts),
            ..Self::default()
        })
    }

    /// Policy that never gives up on retryable failures.
    ///
    /// Pair it with the client's [`CancelToken`] or a deadline.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            limit: RetryLimit::Unlimited,
            ..Self::default()
        }
    }

    /// Maps the "max retries" count used by config files: `0` is unlimited.
    #[must_use]
    pub fn from_max_retries(max_retries: u32) -> Self {
        match NonZeroU32::new(max_retries) {
            Some(attempts) => Self {
                limit: RetryLimit::Attempts(attempts),
                ..Self::default()
            },
            None => Self::unlimited(),
        }
    }

    /// Sets the pause between attempts.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the overall deadline per logical request.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns true if attempt number `attempt` (1-based) is permitted.
    #[must_use]
    pub fn allows(&self, attempt: u32) -> bool {
        match self.limit {
            RetryLimit::Attempts(max) => attempt <= max.get(),
            RetryLimit::Unlimited => true,
        }
    }

    /// Returns true for the unlimited policy.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.limit == RetryLimit::Unlimited
    }
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Client-wide cancellation signal.
///
/// Cancelling wakes every in-flight request and retry pause; requests made
/// afterwards fail immediately with [`Error::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes all waiters.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Returns true once [`CancelToken::cancel`] was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves when the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_finite() {
        let policy = RetryPolicy::default();

        assert!(!policy.is_unlimited());
        assert!(policy.allows(1));
        assert!(policy.allows(DEFAULT_MAX_ATTEMPTS));
        assert!(!policy.allows(DEFAULT_MAX_ATTEMPTS + 1));
        assert_eq!(policy.interval, Duration::from_millis(500));
        assert_eq!(policy.deadline, None);
    }

    #[test]
    fn test_limited_rejects_zero() {
        assert!(RetryPolicy::limited(0).unwrap_err().is_invalid_argument());

        let policy = RetryPolicy::limited(1).unwrap();
        assert!(policy.allows(1));
        assert!(!policy.allows(2));
    }

    #[test]
    fn test_from_max_retries_zero_is_unlimited() {
        let policy = RetryPolicy::from_max_retries(0);
        assert!(policy.is_unlimited());
        assert!(policy.allows(u32::MAX));

        let policy = RetryPolicy::from_max_retries(5);
        assert!(policy.allows(5));
        assert!(!policy.allows(6));
    }

    #[test]
    fn test_builders() {
        let policy = RetryPolicy::unlimited()
            .with_interval(Duration::from_millis(10))
            .with_deadline(Duration::from_secs(2));

        assert_eq!(policy.interval, Duration::from_millis(10));
        assert_eq!(policy.deadline, Some(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_cancel_token_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        tokio::task::yield_now().await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .expect("task should not panic");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_returns_immediately_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();

        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("already cancelled token resolves");
    }
}
