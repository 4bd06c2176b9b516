//! Retry helpers for store writes.
//!
//! Source calls go through the [`Gateway`](crate::gateway::Gateway), whose
//! schedule is driven by the server's signals. Store writes only need to
//! ride out transient contention (a locked SQLite file, a pool that is
//! briefly exhausted), which plain jittered exponential backoff handles.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use sea_orm::DbErr;

/// Initial delay before retrying a store write.
pub const INITIAL_DB_BACKOFF_MS: u64 = 50;

/// Upper bound on a single store write backoff.
pub const MAX_DB_BACKOFF_MS: u64 = 2_000;

/// Retries after the first failed store write.
pub const MAX_DB_RETRIES: usize = 4;

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: usize,
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(INITIAL_DB_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_DB_BACKOFF_MS),
            max_retries: MAX_DB_RETRIES,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay,
            max_delay,
            max_retries,
            with_jitter: true,
        }
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Whether a database error is worth retrying.
///
/// Connection acquisition failures and lock/busy errors are transient;
/// constraint violations and schema errors are not.
pub fn is_transient_db_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(_) | DbErr::Query(_) => {
            let err_str = err.to_string().to_lowercase();
            err_str.contains("locked")
                || err_str.contains("busy")
                || err_str.contains("timeout")
                || err_str.contains("connection reset")
        }
        _ => false,
    }
}

/// Run a store write, retrying transient database errors.
///
/// ```ignore
/// let rows = with_db_retry("upsert actor", || async {
///     Actor::insert(model.clone()).exec_without_returning(db).await
/// })
/// .await?;
/// ```
pub async fn with_db_retry<T, F, Fut>(label: &str, operation: F) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    with_db_retry_config(label, RetryConfig::default(), operation).await
}

/// [`with_db_retry`] with an explicit configuration.
pub async fn with_db_retry_config<T, F, Fut>(
    label: &str,
    config: RetryConfig,
    mut operation: F,
) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(config.into_backoff())
        .notify(|err: &DbErr, dur: Duration| {
            tracing::warn!(
                label,
                attempt = attempt.load(Ordering::SeqCst),
                delay_ms = dur.as_millis() as u64,
                error = %err,
                "Transient database error, retrying"
            );
        })
        .when(is_transient_db_error)
        .await
}
