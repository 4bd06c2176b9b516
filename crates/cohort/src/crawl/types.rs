//! Options, outcomes, and reports of a crawl.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::entity::interaction_kind::InteractionKind;
use crate::gateway::SoftFailure;
use crate::source::{RepoRef, SourceError};
use crate::store::{Position, StoreError};

/// Concurrent enrichment pipelines per batch.
pub const DEFAULT_BATCH_WIDTH: usize = 5;

/// Actors requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// What to do with a page whose batch contains a failed actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailedActorPolicy {
    /// Log the failure and advance the checkpoint anyway. The actor is not
    /// retried until the page is crawled again.
    #[default]
    Skip,
    /// Leave the checkpoint where it was and stop crawling this kind, so
    /// the next run retries the whole page.
    HoldCheckpoint,
}

/// Tuning for a crawl run.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub batch_width: usize,
    pub page_size: u32,
    /// Event history pages scanned per actor for a commit email.
    pub event_pages: u32,
    pub failed_actor_policy: FailedActorPolicy,
    /// Kinds to crawl, in order. Kinds not listed are skipped.
    pub kinds: Vec<InteractionKind>,
    /// Set to request a stop after the current page.
    pub shutdown: Option<Arc<AtomicBool>>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            batch_width: DEFAULT_BATCH_WIDTH,
            page_size: DEFAULT_PAGE_SIZE,
            event_pages: crate::enrich::DEFAULT_EVENT_PAGES,
            failed_actor_policy: FailedActorPolicy::default(),
            kinds: InteractionKind::ALL.to_vec(),
            shutdown: None,
        }
    }
}

impl CrawlOptions {
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Result of enriching and persisting one actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorOutcome {
    Synced { login: String },
    Failed { login: String, error: String },
}

impl ActorOutcome {
    pub fn login(&self) -> &str {
        match self {
            Self::Synced { login } | Self::Failed { login, .. } => login,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Why a crawl stopped before the source ran out of pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterruptReason {
    /// A page fetch hit the retry ceiling.
    GaveUp(SoftFailure),
    /// Shutdown was requested.
    Shutdown,
}

/// Terminal state of one `(repository, kind)` crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlStatus {
    Complete,
    /// Stopped early; the checkpoint holds the last completed page.
    Interrupted(InterruptReason),
    /// A page had failed actors under [`FailedActorPolicy::HoldCheckpoint`].
    Halted { page: u32 },
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => f.write_str("complete"),
            Self::Interrupted(InterruptReason::Shutdown) => f.write_str("interrupted (shutdown)"),
            Self::Interrupted(InterruptReason::GaveUp(failure)) => {
                write!(f, "interrupted ({failure})")
            }
            Self::Halted { page } => write!(f, "halted at page {page}"),
        }
    }
}

/// What one `(repository, kind)` crawl did.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub repo: RepoRef,
    pub kind: InteractionKind,
    /// Checkpoint the crawl resumed from, if any.
    pub resumed_from: Option<Position>,
    /// Pages fetched in this run.
    pub pages: u32,
    /// Checkpoints written in this run.
    pub checkpoints: u32,
    pub outcomes: Vec<ActorOutcome>,
    pub status: CrawlStatus,
}

impl CrawlReport {
    pub(crate) fn new(repo: &RepoRef, kind: InteractionKind, resumed_from: Option<Position>) -> Self {
        Self {
            repo: repo.clone(),
            kind,
            resumed_from,
            pages: 0,
            checkpoints: 0,
            outcomes: Vec::new(),
            status: CrawlStatus::Complete,
        }
    }

    pub fn synced(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_failed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.status == CrawlStatus::Complete
    }

    pub fn was_shut_down(&self) -> bool {
        self.status == CrawlStatus::Interrupted(InterruptReason::Shutdown)
    }
}

/// Errors that abort a crawl. Actor-level failures never surface here.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("{repo} {kind}: {source}")]
    Source {
        repo: String,
        kind: InteractionKind,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CrawlError {
    pub(crate) fn fetch(repo: &RepoRef, kind: InteractionKind, source: SourceError) -> Self {
        Self::Source {
            repo: repo.to_string(),
            kind,
            source,
        }
    }
}
