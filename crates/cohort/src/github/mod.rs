//! GitHub as the primary source.
//!
//! Star, watch, and fork connections and repository totals come from the
//! GraphQL API; contributors, profiles, and public events from REST.
//!
//! # Module Structure
//!
//! - [`classify`] - Status and header classification into outcome tags
//! - [`graphql`] - Query documents and envelope decoding
//! - `client` - [`GitHubClient`], the [`SourceClient`](crate::source::SourceClient)
//!   implementation

pub mod classify;
mod client;
pub mod graphql;
mod types;

pub use classify::{RateLimitInfo, SECONDARY_LIMIT_FALLBACK, classify, parse_rate_limit_headers};
pub use client::{API_VERSION, DEFAULT_API_BASE, GitHubClient};
