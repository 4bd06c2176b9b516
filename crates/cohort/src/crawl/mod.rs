//! The crawl engine.
//!
//! Control flow for one repository: for each kind, a crawler walks pages
//! sequentially, fans each page out into bounded batches of enrichment and
//! upserts, and persists a checkpoint once the page has settled. Cursor
//! kinds are then reconciled against the source's totals.
//!
//! # Module Structure
//!
//! - [`types`] - Options, per-actor outcomes, reports, and errors
//! - [`context`] - [`CrawlContext`] and its builder
//! - `batch` - Bounded per-page fan-out
//! - [`cursor`] - Stars, watchers, and forks
//! - [`paged`] - Contributors
//! - [`reconcile`] - Authoritative total comparison
//! - [`orchestrator`] - Kinds per repository, repositories per run

mod batch;
pub mod context;
pub mod cursor;
pub mod orchestrator;
pub mod paged;
pub mod reconcile;
pub mod types;

pub use context::{CrawlContext, CrawlContextBuilder, CrawlContextError};
pub use cursor::{CursorState, crawl_cursor};
pub use orchestrator::{KindReport, RepositoryReport, crawl_kind, sync_repositories, sync_repository};
pub use paged::crawl_contributors;
pub use reconcile::{Reconciliation, reconcile};
pub use types::{
    ActorOutcome, CrawlError, CrawlOptions, CrawlReport, CrawlStatus, DEFAULT_BATCH_WIDTH,
    DEFAULT_PAGE_SIZE, FailedActorPolicy, InterruptReason,
};
