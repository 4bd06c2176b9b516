//! Cohort - a resumable, rate-limit-aware crawler for repository audiences.
//!
//! Cohort walks the stargazers, watchers, forks, and contributors of
//! GitHub repositories, enriches every actor it finds with profile data,
//! and upserts the result into a SQL store. Each `(repository, kind)` crawl
//! is checkpointed after every settled page, so an interrupted run resumes
//! where it stopped.
//!
//! # Features
//!
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to automatically run migrations on connection.
//! - `sqlite` / `postgres` - Database backends.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cohort::{CrawlContext, GitHubClient, RepoRef, connect_and_migrate, sync_repositories};
//!
//! let db = connect_and_migrate("sqlite://cohort.db?mode=rwc").await?;
//! let github = GitHubClient::with_reqwest(Some(token), Duration::from_secs(30))?;
//! let ctx = CrawlContext::builder()
//!     .client(Arc::new(github))
//!     .database(Arc::new(db))
//!     .build()?;
//!
//! let reports = sync_repositories(&ctx, &[RepoRef::parse("rust-lang/rust")?]).await;
//! ```

pub mod clock;
pub mod crawl;
pub mod db;
pub mod enrich;
pub mod entity;
pub mod gateway;
pub mod github;
pub mod http;
pub mod progress;
pub mod record;
pub mod retry;
pub mod source;
pub mod store;

#[cfg(feature = "migrate")]
pub mod migration;

pub use crawl::{
    CrawlContext, CrawlError, CrawlOptions, CrawlReport, CrawlStatus, FailedActorPolicy,
    RepositoryReport, sync_repositories, sync_repository,
};
pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use gateway::{Gateway, Outcome, Retried, RetryPolicy, SoftFailure};
pub use github::GitHubClient;
pub use progress::{CrawlProgress, ProgressCallback};
pub use record::{ActorDocument, ActorRecord, Edge};
pub use source::{RepoRef, SourceClient, SourceError};
pub use store::StoreError;
