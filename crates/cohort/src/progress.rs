//! Progress events emitted while crawling.
//!
//! The library never prints. Front ends register a [`ProgressCallback`] and
//! render events as progress bars or log lines.

use crate::entity::interaction_kind::InteractionKind;

/// Progress events emitted during a crawl.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CrawlProgress {
    /// Starting work on a repository.
    RepositoryStarted {
        repo: String,
        /// Position of this repository in the run (1-indexed).
        index: usize,
        total: usize,
    },

    /// Starting (or resuming) the crawl of one interaction kind.
    CrawlStarted {
        repo: String,
        kind: InteractionKind,
        /// Human-readable resume position, `None` for a fresh crawl.
        resume_from: Option<String>,
    },

    /// Fetched a page of actors.
    PageFetched {
        repo: String,
        kind: InteractionKind,
        /// Page number within this run (1-indexed).
        page: u32,
        actors: usize,
    },

    /// One actor was enriched and persisted.
    ActorSynced {
        repo: String,
        kind: InteractionKind,
        login: String,
    },

    /// One actor failed; the rest of its batch is unaffected.
    ActorFailed {
        repo: String,
        kind: InteractionKind,
        login: String,
        error: String,
    },

    /// The checkpoint advanced after a page settled.
    CheckpointSaved {
        repo: String,
        kind: InteractionKind,
        position: String,
    },

    /// Finished the crawl of one interaction kind.
    CrawlFinished {
        repo: String,
        kind: InteractionKind,
        status: String,
        pages: u32,
        actors: usize,
    },

    /// Persisted count is below the authoritative total; re-crawling.
    ReconcileMismatch {
        repo: String,
        kind: InteractionKind,
        persisted: u64,
        authoritative: u64,
    },

    /// Persisted count matched or exceeded the authoritative total.
    ReconcileAccepted {
        repo: String,
        kind: InteractionKind,
        persisted: u64,
        authoritative: u64,
    },

    /// Sleeping before retrying a source call.
    Backoff {
        label: String,
        attempt: u32,
        delay_ms: u64,
        reason: String,
    },

    /// A source call hit the retry ceiling.
    GaveUp { label: String, attempts: u32 },

    /// Finished a repository.
    RepositoryFinished {
        repo: String,
        /// Persisted actor counts per interaction kind.
        totals: Vec<(InteractionKind, u64)>,
    },

    /// A repository failed; the run continues with the next one.
    RepositoryFailed { repo: String, error: String },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(CrawlProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: CrawlProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
