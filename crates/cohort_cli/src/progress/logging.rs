use cohort::CrawlProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: CrawlProgress) {
        match event {
            CrawlProgress::RepositoryStarted { repo, index, total } => {
                tracing::info!(repo = %repo, index, total, "Syncing repository");
            }

            CrawlProgress::CrawlStarted {
                repo,
                kind,
                resume_from,
            } => {
                tracing::info!(repo = %repo, kind = %kind, resume_from = ?resume_from, "Crawl started");
            }

            CrawlProgress::PageFetched {
                repo,
                kind,
                page,
                actors,
            } => {
                tracing::debug!(repo = %repo, kind = %kind, page, actors, "Fetched page");
            }

            CrawlProgress::ActorSynced { repo, kind, login } => {
                tracing::debug!(repo = %repo, kind = %kind, login = %login, "Actor synced");
            }

            CrawlProgress::ActorFailed {
                repo,
                kind,
                login,
                error,
            } => {
                tracing::warn!(repo = %repo, kind = %kind, login = %login, error = %error, "Actor failed");
            }

            CrawlProgress::CheckpointSaved {
                repo,
                kind,
                position,
            } => {
                tracing::debug!(repo = %repo, kind = %kind, position = %position, "Checkpoint saved");
            }

            CrawlProgress::CrawlFinished {
                repo,
                kind,
                status,
                pages,
                actors,
            } => {
                tracing::info!(repo = %repo, kind = %kind, status = %status, pages, actors, "Crawl finished");
            }

            CrawlProgress::ReconcileMismatch {
                repo,
                kind,
                persisted,
                authoritative,
            } => {
                tracing::warn!(
                    repo = %repo,
                    kind = %kind,
                    persisted,
                    authoritative,
                    "Stored count below reported total, re-crawling"
                );
            }

            CrawlProgress::ReconcileAccepted {
                repo,
                kind,
                persisted,
                authoritative,
            } => {
                tracing::info!(repo = %repo, kind = %kind, persisted, authoritative, "Counts reconciled");
            }

            CrawlProgress::Backoff {
                label,
                attempt,
                delay_ms,
                reason,
            } => {
                tracing::warn!(label = %label, attempt, delay_ms, reason = %reason, "Backing off");
            }

            CrawlProgress::GaveUp { label, attempts } => {
                tracing::error!(label = %label, attempts, "Gave up");
            }

            CrawlProgress::RepositoryFinished { repo, totals } => {
                let totals = totals
                    .iter()
                    .map(|(kind, count)| format!("{kind}={count}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                tracing::info!(repo = %repo, totals = %totals, "Repository finished");
            }

            CrawlProgress::RepositoryFailed { repo, error } => {
                tracing::error!(repo = %repo, error = %error, "Repository failed");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
