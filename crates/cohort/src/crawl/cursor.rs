//! Cursor-paginated crawl of stars, watchers, and forks.

use crate::entity::interaction_kind::InteractionKind;
use crate::gateway::Retried;
use crate::progress::CrawlProgress;
use crate::record::Edge;
use crate::source::RepoRef;
use crate::store::{Position, SaveOutcome, checkpoint};

use super::batch::process_page;
use super::context::CrawlContext;
use super::types::{CrawlError, CrawlReport, CrawlStatus, FailedActorPolicy, InterruptReason};

/// Position of a cursor crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorState {
    NotStarted,
    /// The page after this cursor is next.
    InProgress(String),
    Complete,
}

impl CursorState {
    fn cursor(&self) -> Option<&str> {
        match self {
            Self::InProgress(cursor) => Some(cursor),
            Self::NotStarted | Self::Complete => None,
        }
    }
}

/// Crawl one cursor-paginated kind of `repo`, resuming from its checkpoint.
///
/// The checkpoint advances only after a page's whole batch has settled, and
/// only while the source reports a further page; the terminal page moves
/// straight to [`CursorState::Complete`] without a write.
pub async fn crawl_cursor(
    ctx: &CrawlContext,
    repo: &RepoRef,
    kind: InteractionKind,
) -> Result<CrawlReport, CrawlError> {
    let stored = checkpoint::load(&ctx.db, repo, kind).await?;
    let (mut state, mut pages_completed, resumed_from) = match stored {
        Some(cp) => match cp.position {
            Position::Cursor(cursor) => (
                CursorState::InProgress(cursor.clone()),
                cp.pages_completed,
                Some(Position::Cursor(cursor)),
            ),
            Position::Page(page) => {
                tracing::warn!(repo = %repo, kind = %kind, page, "Ignoring page checkpoint on a cursor kind");
                (CursorState::NotStarted, 0, None)
            }
        },
        None => (CursorState::NotStarted, 0, None),
    };

    let mut report = CrawlReport::new(repo, kind, resumed_from);
    tracing::info!(
        repo = %repo,
        kind = %kind,
        resume = ?report.resumed_from,
        "Starting cursor crawl"
    );
    ctx.emit(CrawlProgress::CrawlStarted {
        repo: repo.to_string(),
        kind,
        resume_from: report.resumed_from.as_ref().map(ToString::to_string),
    });

    while state != CursorState::Complete {
        if ctx.options.is_shutdown_requested() {
            report.status = CrawlStatus::Interrupted(InterruptReason::Shutdown);
            break;
        }

        let cursor = state.cursor();
        let label = format!("{repo} {kind} after {}", cursor.unwrap_or("start"));
        let page = match ctx
            .gateway
            .execute(&label, || {
                ctx.client
                    .connection_page(repo, kind, cursor, ctx.options.page_size)
            })
            .await
        {
            Ok(Retried::Done(page)) => page,
            Ok(Retried::GaveUp(failure)) => {
                tracing::warn!(repo = %repo, kind = %kind, %failure, "Page fetch gave up; checkpoint kept");
                report.status = CrawlStatus::Interrupted(InterruptReason::GaveUp(failure));
                break;
            }
            Err(e) => return Err(CrawlError::fetch(repo, kind, e)),
        };

        report.pages += 1;
        tracing::debug!(
            repo = %repo,
            kind = %kind,
            page = report.pages,
            actors = page.logins.len(),
            has_next = page.has_next_page,
            "Fetched page"
        );
        ctx.emit(CrawlProgress::PageFetched {
            repo: repo.to_string(),
            kind,
            page: report.pages,
            actors: page.logins.len(),
        });

        let actors = page
            .logins
            .into_iter()
            .map(|login| (login, Edge::new(kind, repo)))
            .collect();
        let outcomes = process_page(ctx, repo, kind, actors).await;
        let any_failed = outcomes.iter().any(|o| o.is_failed());
        report.outcomes.extend(outcomes);

        if any_failed && ctx.options.failed_actor_policy == FailedActorPolicy::HoldCheckpoint {
            tracing::warn!(repo = %repo, kind = %kind, page = report.pages, "Holding checkpoint after failed actors");
            report.status = CrawlStatus::Halted { page: report.pages };
            break;
        }

        state = match (page.has_next_page, page.end_cursor) {
            (true, Some(end_cursor)) => {
                pages_completed += 1;
                let position = Position::Cursor(end_cursor.clone());
                if checkpoint::save(&ctx.db, repo, kind, &position, pages_completed).await?
                    == SaveOutcome::Saved
                {
                    report.checkpoints += 1;
                    ctx.emit(CrawlProgress::CheckpointSaved {
                        repo: repo.to_string(),
                        kind,
                        position: position.to_string(),
                    });
                }
                CursorState::InProgress(end_cursor)
            }
            (true, None) => {
                tracing::warn!(repo = %repo, kind = %kind, "Next page reported without a cursor; stopping");
                CursorState::Complete
            }
            (false, _) => CursorState::Complete,
        };
    }

    finish(ctx, &report);
    Ok(report)
}

pub(crate) fn finish(ctx: &CrawlContext, report: &CrawlReport) {
    tracing::info!(
        repo = %report.repo,
        kind = %report.kind,
        status = %report.status,
        pages = report.pages,
        synced = report.synced(),
        failed = report.failed(),
        "Crawl finished"
    );
    ctx.emit(CrawlProgress::CrawlFinished {
        repo: report.repo.to_string(),
        kind: report.kind,
        status: report.status.to_string(),
        pages: report.pages,
        actors: report.outcomes.len(),
    });
}
