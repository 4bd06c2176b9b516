//! The primary source of interaction and profile data.
//!
//! Crawlers never talk to GitHub directly. They receive a
//! [`SourceClient`] handle, constructed once, and every call it makes
//! returns a classified [`Outcome`] that the gateway dispatches on.

mod errors;
#[cfg(test)]
pub(crate) mod fake;
mod types;

use async_trait::async_trait;

use crate::entity::interaction_kind::InteractionKind;
use crate::gateway::Outcome;

pub use errors::{SourceError, short_error_message};
pub use types::{
    ActorProfile, ConnectionPage, Contributor, PublicEvent, RepoRef, RepoRefError,
    RepositoryTotals,
};

/// Read-only access to a repository-hosting platform.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// One page of the star, watch, or fork connection, starting after `cursor`.
    async fn connection_page(
        &self,
        repo: &RepoRef,
        kind: InteractionKind,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Outcome<ConnectionPage>;

    /// One page (1-based) of the contributor listing. Empty means done.
    async fn contributors_page(
        &self,
        repo: &RepoRef,
        page: u32,
        per_page: u32,
    ) -> Outcome<Vec<Contributor>>;

    /// Authoritative totals, used only for reconciliation.
    async fn repository_totals(&self, repo: &RepoRef) -> Outcome<RepositoryTotals>;

    /// Primary profile for `login`.
    async fn user_profile(&self, login: &str) -> Outcome<ActorProfile>;

    /// One page (1-based) of the actor's public events, newest first.
    async fn user_events(&self, login: &str, page: u32, per_page: u32)
    -> Outcome<Vec<PublicEvent>>;
}
