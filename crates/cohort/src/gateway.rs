//! Rate-limited gateway wrapping every call to the primary source.
//!
//! The gateway owns the retry policy. Each attempt yields a classified
//! [`Outcome`]; quota exhaustion, throttling, and 5xx responses are slept
//! through and retried up to a fixed ceiling, after which the caller gets a
//! [`SoftFailure`] value instead of an error. Any other error is returned
//! immediately.
//!
//! ```ignore
//! use cohort::gateway::{Gateway, Retried, RetryPolicy};
//!
//! let gateway = Gateway::new(RetryPolicy::default());
//! match gateway.execute("user:octocat", || client.user_profile("octocat")).await? {
//!     Retried::Done(profile) => println!("{}", profile.login),
//!     Retried::GaveUp(failure) => tracing::warn!("{failure}"),
//! }
//! ```

mod outcome;
mod pacing;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::{Clock, TokioClock};
use crate::progress::{CrawlProgress, ProgressCallback, emit};
use crate::source::SourceError;

pub use outcome::Outcome;
pub use pacing::{ApiRateLimiter, GITHUB_DEFAULT_RPS};

/// Default attempt ceiling per call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Base of the exponential 5xx backoff.
pub const SERVER_BACKOFF_BASE: Duration = Duration::from_secs(2);

/// Upper bound on a single 5xx backoff.
pub const SERVER_BACKOFF_CAP: Duration = Duration::from_secs(60);

/// Added to the quota reset wait so the retry lands after the reset.
pub const RESET_PADDING: Duration = Duration::from_secs(1);

/// Retry ceiling and backoff shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub server_backoff_base: Duration,
    pub server_backoff_cap: Duration,
    pub reset_padding: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            server_backoff_base: SERVER_BACKOFF_BASE,
            server_backoff_cap: SERVER_BACKOFF_CAP,
            reset_padding: RESET_PADDING,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Wait before the `retry`-th retry (1-based) after a 5xx:
    /// `min(2^retry * base, cap)`.
    #[must_use]
    pub fn server_backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.server_backoff_base
            .saturating_mul(factor)
            .min(self.server_backoff_cap)
    }

    /// Wait for a quota reset: `max(reset_at - now, 0) + padding`.
    #[must_use]
    pub fn quota_wait(&self, reset_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        (reset_at - now).to_std().unwrap_or(Duration::ZERO) + self.reset_padding
    }
}

/// Why an attempt was retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    QuotaExhausted { reset_at: DateTime<Utc> },
    Throttled { retry_after: Duration },
    ServerError { status: u16 },
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExhausted { reset_at } => write!(f, "quota exhausted until {reset_at}"),
            Self::Throttled { retry_after } => write!(f, "throttled for {retry_after:?}"),
            Self::ServerError { status } => write!(f, "server error {status}"),
        }
    }
}

/// The attempt ceiling was reached without a usable response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{label}: gave up after {attempts} attempts ({last})")]
pub struct SoftFailure {
    pub label: String,
    pub attempts: u32,
    pub last: RetryReason,
}

/// Non-error result of [`Gateway::execute`].
#[derive(Debug)]
pub enum Retried<T> {
    Done(T),
    GaveUp(SoftFailure),
}

impl<T> Retried<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            Self::GaveUp(_) => None,
        }
    }
}

/// Retrying, paced entry point for source calls. Cheap to clone.
#[derive(Clone)]
pub struct Gateway {
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    limiter: Option<ApiRateLimiter>,
    on_progress: Option<Arc<ProgressCallback>>,
}

impl Gateway {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            clock: Arc::new(TokioClock),
            limiter: None,
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_limiter(mut self, limiter: ApiRateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: Arc<ProgressCallback>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or
    /// the attempt ceiling is reached.
    pub async fn execute<T, F, Fut>(
        &self,
        label: &str,
        mut call: F,
    ) -> Result<Retried<T>, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Outcome<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if let Some(limiter) = &self.limiter {
                limiter.wait().await;
            }

            let (reason, delay) = match call().await {
                Outcome::Ok(value) => return Ok(Retried::Done(value)),
                Outcome::Other(e) => return Err(e),
                Outcome::RateLimited { reset_at } => (
                    RetryReason::QuotaExhausted { reset_at },
                    self.policy.quota_wait(reset_at, self.clock.now()),
                ),
                Outcome::Throttled { retry_after } => {
                    (RetryReason::Throttled { retry_after }, retry_after)
                }
                Outcome::ServerError { status } => (
                    RetryReason::ServerError { status },
                    self.policy.server_backoff(attempt),
                ),
            };

            if attempt >= max_attempts {
                tracing::warn!(
                    label,
                    attempts = attempt,
                    reason = %reason,
                    "Giving up after retry ceiling"
                );
                emit(
                    self.on_progress.as_deref(),
                    CrawlProgress::GaveUp {
                        label: label.to_string(),
                        attempts: attempt,
                    },
                );
                return Ok(Retried::GaveUp(SoftFailure {
                    label: label.to_string(),
                    attempts: attempt,
                    last: reason,
                }));
            }

            tracing::debug!(
                label,
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason = %reason,
                "Backing off before retry"
            );
            emit(
                self.on_progress.as_deref(),
                CrawlProgress::Backoff {
                    label: label.to_string(),
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                    reason: reason.to_string(),
                },
            );
            self.clock.sleep(delay).await;
        }
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("policy", &self.policy)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::clock::ManualClock;

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp")
    }

    fn gateway_with_clock(policy: RetryPolicy) -> (Gateway, ManualClock) {
        let clock = ManualClock::starting_at(epoch());
        let gateway = Gateway::new(policy).with_clock(Arc::new(clock.clone()));
        (gateway, clock)
    }

    #[test]
    fn server_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        let secs: Vec<u64> = (1..=7).map(|n| policy.server_backoff(n).as_secs()).collect();
        assert_eq!(secs, vec![4, 8, 16, 32, 60, 60, 60]);
        assert_eq!(policy.server_backoff(40), SERVER_BACKOFF_CAP);
    }

    #[test]
    fn quota_wait_never_negative() {
        let policy = RetryPolicy::default();
        let now = epoch();
        assert_eq!(
            policy.quota_wait(now + chrono::Duration::seconds(30), now),
            Duration::from_secs(31)
        );
        assert_eq!(
            policy.quota_wait(now - chrono::Duration::seconds(30), now),
            Duration::from_secs(1)
        );
    }

    #[tokio::test]
    async fn perpetual_quota_exhaustion_stops_at_ceiling() {
        let (gateway, clock) = gateway_with_clock(RetryPolicy::default());
        let calls = AtomicU32::new(0);
        let reset_at = epoch() + chrono::Duration::seconds(30);

        let result = gateway
            .execute("stargazers:rust-lang/rust", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Outcome::<()>::RateLimited { reset_at } }
            })
            .await
            .expect("soft failure is not an error");

        assert_eq!(calls.load(Ordering::SeqCst), DEFAULT_MAX_ATTEMPTS);
        match result {
            Retried::GaveUp(failure) => {
                assert_eq!(failure.attempts, DEFAULT_MAX_ATTEMPTS);
                assert_eq!(failure.label, "stargazers:rust-lang/rust");
                assert!(matches!(failure.last, RetryReason::QuotaExhausted { .. }));
            }
            Retried::Done(()) => panic!("expected soft failure"),
        }

        // First wait covers the remaining 30s window; later waits find the
        // reset in the past and only pad.
        let sleeps = clock.sleeps();
        assert_eq!(sleeps.len(), (DEFAULT_MAX_ATTEMPTS - 1) as usize);
        assert_eq!(sleeps[0], Duration::from_secs(31));
        assert!(sleeps[1..].iter().all(|d| *d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn server_errors_follow_exponential_schedule() {
        let (gateway, clock) = gateway_with_clock(RetryPolicy::default().with_max_attempts(7));
        let calls = AtomicU32::new(0);

        let result = gateway
            .execute("user:octocat", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Outcome::<()>::ServerError { status: 502 } }
            })
            .await
            .expect("soft failure is not an error");

        assert!(matches!(result, Retried::GaveUp(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 7);
        let secs: Vec<u64> = clock.sleeps().iter().map(Duration::as_secs).collect();
        assert_eq!(secs, vec![4, 8, 16, 32, 60, 60]);
    }

    #[tokio::test]
    async fn throttling_sleeps_server_suggested_delay() {
        let (gateway, clock) = gateway_with_clock(RetryPolicy::default());
        let calls = AtomicU32::new(0);

        let result = gateway
            .execute("events:octocat", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Outcome::Throttled {
                            retry_after: Duration::from_secs(17),
                        }
                    } else {
                        Outcome::Ok("page")
                    }
                }
            })
            .await
            .expect("no error");

        assert!(matches!(result, Retried::Done("page")));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(17)]);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let (gateway, clock) = gateway_with_clock(RetryPolicy::default());
        let calls = AtomicU32::new(0);

        let err = gateway
            .execute("user:ghost", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Outcome::<()>::Other(SourceError::not_found("users/ghost")) }
            })
            .await
            .expect_err("non-retryable errors propagate");

        assert!(err.is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn recovers_after_transient_fault() {
        let (gateway, clock) = gateway_with_clock(RetryPolicy::default());
        let calls = AtomicU32::new(0);

        let result = gateway
            .execute("totals:rust-lang/rust", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Outcome::ServerError { status: 503 }
                    } else {
                        Outcome::Ok(42u64)
                    }
                }
            })
            .await
            .expect("no error");

        assert_eq!(result.ok(), Some(42));
        let secs: Vec<u64> = clock.sleeps().iter().map(Duration::as_secs).collect();
        assert_eq!(secs, vec![4, 8]);
    }

    #[tokio::test]
    async fn backoff_events_reach_progress_callback() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: Arc<ProgressCallback> = Arc::new(Box::new(move |event: CrawlProgress| {
            if let CrawlProgress::Backoff { delay_ms, .. } = event {
                sink.lock().expect("lock").push(delay_ms);
            }
        }));
        let clock = ManualClock::starting_at(epoch());
        let gateway = Gateway::new(RetryPolicy::default().with_max_attempts(2))
            .with_clock(Arc::new(clock))
            .with_progress(callback);

        let _ = gateway
            .execute("user:octocat", || async {
                Outcome::<()>::ServerError { status: 500 }
            })
            .await;

        assert_eq!(*seen.lock().expect("lock"), vec![4_000]);
    }
}
