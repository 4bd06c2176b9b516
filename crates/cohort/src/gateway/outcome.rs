use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::source::SourceError;

/// Classified result of a single outbound call.
///
/// Retry logic dispatches on the tag; only [`Outcome::Other`] carries an
/// error that is propagated to the caller.
#[derive(Debug)]
pub enum Outcome<T> {
    Ok(T),
    /// Primary quota exhausted until `reset_at`.
    RateLimited { reset_at: DateTime<Utc> },
    /// Secondary/abuse throttling with a server-suggested delay.
    Throttled { retry_after: Duration },
    /// Transient 5xx.
    ServerError { status: u16 },
    Other(SourceError),
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Ok(value) => Outcome::Ok(f(value)),
            Self::RateLimited { reset_at } => Outcome::RateLimited { reset_at },
            Self::Throttled { retry_after } => Outcome::Throttled { retry_after },
            Self::ServerError { status } => Outcome::ServerError { status },
            Self::Other(e) => Outcome::Other(e),
        }
    }

    /// Chain a fallible conversion onto a successful outcome.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Result<U, SourceError>) -> Outcome<U> {
        match self {
            Self::Ok(value) => f(value).into(),
            Self::RateLimited { reset_at } => Outcome::RateLimited { reset_at },
            Self::Throttled { retry_after } => Outcome::Throttled { retry_after },
            Self::ServerError { status } => Outcome::ServerError { status },
            Self::Other(e) => Outcome::Other(e),
        }
    }

    /// Chain a call whose result is itself classified.
    pub fn then<U>(self, f: impl FnOnce(T) -> Outcome<U>) -> Outcome<U> {
        match self {
            Self::Ok(value) => f(value),
            Self::RateLimited { reset_at } => Outcome::RateLimited { reset_at },
            Self::Throttled { retry_after } => Outcome::Throttled { retry_after },
            Self::ServerError { status } => Outcome::ServerError { status },
            Self::Other(e) => Outcome::Other(e),
        }
    }

    /// Short tag for log fields.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Ok(_) => "ok",
            Self::RateLimited { .. } => "rate_limited",
            Self::Throttled { .. } => "throttled",
            Self::ServerError { .. } => "server_error",
            Self::Other(_) => "other",
        }
    }
}

impl<T> From<Result<T, SourceError>> for Outcome<T> {
    fn from(result: Result<T, SourceError>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Other(e),
        }
    }
}
