use thiserror::Error;

use crate::http::HttpError;

/// Errors surfaced by the primary source that are not retry signals.
///
/// Quota, throttling, and 5xx responses never become a `SourceError`; they
/// are classified into [`Outcome`](crate::gateway::Outcome) tags instead.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Resource not found, or the account is suspended.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Access denied without a rate-limit signal.
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Unexpected HTTP status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// GraphQL-level error in a 200 response.
    #[error("GraphQL error: {message}")]
    GraphQl { message: String },

    /// Network or connection error.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Response body did not have the expected shape.
    #[error("Unexpected response: {message}")]
    Decode { message: String },
}

impl SourceError {
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<HttpError> for SourceError {
    fn from(e: HttpError) -> Self {
        Self::Network {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        Self::decode(e.to_string())
    }
}

/// First line of an error message, for log lines and progress events.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}
