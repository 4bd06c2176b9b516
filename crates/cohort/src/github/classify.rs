//! Classification of raw GitHub responses into gateway outcomes.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::gateway::Outcome;
use crate::http::HttpResponse;
use crate::source::SourceError;

/// Wait applied to a secondary limit that names no delay.
pub const SECONDARY_LIMIT_FALLBACK: Duration = Duration::from_secs(60);

/// Primary quota state reported on every API response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: Option<u64>,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

/// Read the `x-ratelimit-*` headers.
pub fn parse_rate_limit_headers(response: &HttpResponse) -> Option<RateLimitInfo> {
    let remaining = response
        .header("x-ratelimit-remaining")
        .and_then(|v| v.trim().parse::<u64>().ok())?;
    let reset_epoch = response
        .header("x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<i64>().ok())?;
    let reset_at = DateTime::from_timestamp(reset_epoch, 0)?;
    let limit = response
        .header("x-ratelimit-limit")
        .and_then(|v| v.trim().parse::<u64>().ok());

    Some(RateLimitInfo {
        limit,
        remaining,
        reset_at,
    })
}

/// Read `retry-after` as whole seconds.
pub fn parse_retry_after(response: &HttpResponse) -> Option<Duration> {
    response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// The rate-limit tag for a response that carries a limit signal, if any.
fn limit_signal<T>(response: &HttpResponse) -> Option<Outcome<T>> {
    if let Some(info) = parse_rate_limit_headers(response)
        && info.remaining == 0
    {
        return Some(Outcome::RateLimited {
            reset_at: info.reset_at,
        });
    }
    if let Some(retry_after) = parse_retry_after(response) {
        return Some(Outcome::Throttled { retry_after });
    }
    None
}

/// Classify an HTTP response.
///
/// - 2xx passes through.
/// - 403/429 with `x-ratelimit-remaining: 0` is a quota wait until
///   `x-ratelimit-reset`; with `retry-after` it is a throttle of that length.
///   A 429 (or a 403 whose body mentions a secondary rate limit) without
///   either header is throttled for [`SECONDARY_LIMIT_FALLBACK`].
/// - 5xx is transient.
/// - 404 and 410 are not-found; everything else is an API error.
pub fn classify(response: HttpResponse, resource: &str) -> Outcome<HttpResponse> {
    match response.status {
        200..=299 => Outcome::Ok(response),
        403 | 429 => {
            if let Some(outcome) = limit_signal(&response) {
                return outcome;
            }
            let body = response.text();
            if response.status == 429 || body.to_lowercase().contains("secondary rate limit") {
                Outcome::Throttled {
                    retry_after: SECONDARY_LIMIT_FALLBACK,
                }
            } else {
                Outcome::Other(SourceError::Forbidden {
                    message: format!("{resource}: {}", first_line(&body)),
                })
            }
        }
        500..=599 => Outcome::ServerError {
            status: response.status,
        },
        404 | 410 => Outcome::Other(SourceError::not_found(resource)),
        status => Outcome::Other(SourceError::Api {
            status,
            message: format!("{resource}: {}", first_line(&response.text())),
        }),
    }
}

fn first_line(body: &str) -> &str {
    body.lines().next().unwrap_or_default()
}
