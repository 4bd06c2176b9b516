use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default request pacing for the GitHub API (requests per second).
///
/// 5000 requests/hour is about 1.4/sec; bursts above that are absorbed by
/// the quota-exhausted wait in the gateway.
pub const GITHUB_DEFAULT_RPS: u32 = 10;

/// Proactive request pacing shared by every task that holds a clone.
///
/// ```ignore
/// use cohort::gateway::ApiRateLimiter;
///
/// let limiter = ApiRateLimiter::new(10);
/// limiter.wait().await;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
    requests_per_second: NonZeroU32,
}

impl ApiRateLimiter {
    /// Limit to `requests_per_second` (0 is treated as 1).
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
            requests_per_second: rps,
        }
    }

    #[must_use]
    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second.get()
    }

    /// Wait until the limiter admits another request.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}
