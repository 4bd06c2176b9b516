//! Page-numbered crawl of contributors.

use crate::entity::interaction_kind::InteractionKind;
use crate::gateway::Retried;
use crate::progress::CrawlProgress;
use crate::record::Edge;
use crate::source::RepoRef;
use crate::store::{Position, SaveOutcome, checkpoint};

use super::batch::process_page;
use super::context::CrawlContext;
use super::cursor::finish;
use super::types::{CrawlError, CrawlReport, CrawlStatus, FailedActorPolicy, InterruptReason};

/// Crawl the contributor listing of `repo` from `lastCompletedPage + 1`.
///
/// Ends on a page with no entries at all. Bots, organizations, and
/// anonymous entries are dropped from a page but do not end the crawl.
pub async fn crawl_contributors(
    ctx: &CrawlContext,
    repo: &RepoRef,
) -> Result<CrawlReport, CrawlError> {
    let kind = InteractionKind::Contribute;
    let stored = checkpoint::load(&ctx.db, repo, kind).await?;
    let (mut page_number, resumed_from) = match stored.map(|cp| cp.position) {
        Some(Position::Page(last)) => (last.saturating_add(1), Some(Position::Page(last))),
        Some(Position::Cursor(_)) => {
            tracing::warn!(repo = %repo, "Ignoring cursor checkpoint on contributors");
            (1, None)
        }
        None => (1, None),
    };

    let mut report = CrawlReport::new(repo, kind, resumed_from);
    tracing::info!(repo = %repo, start_page = page_number, "Starting contributor crawl");
    ctx.emit(CrawlProgress::CrawlStarted {
        repo: repo.to_string(),
        kind,
        resume_from: report.resumed_from.as_ref().map(ToString::to_string),
    });

    loop {
        if ctx.options.is_shutdown_requested() {
            report.status = CrawlStatus::Interrupted(InterruptReason::Shutdown);
            break;
        }

        let label = format!("{repo} contributors p{page_number}");
        let entries = match ctx
            .gateway
            .execute(&label, || {
                ctx.client
                    .contributors_page(repo, page_number, ctx.options.page_size)
            })
            .await
        {
            Ok(Retried::Done(entries)) => entries,
            Ok(Retried::GaveUp(failure)) => {
                tracing::warn!(repo = %repo, page = page_number, %failure, "Page fetch gave up; checkpoint kept");
                report.status = CrawlStatus::Interrupted(InterruptReason::GaveUp(failure));
                break;
            }
            Err(e) => return Err(CrawlError::fetch(repo, kind, e)),
        };

        if entries.is_empty() {
            break;
        }

        report.pages += 1;
        let actors: Vec<(String, Edge)> = entries
            .iter()
            .filter_map(|entry| {
                entry
                    .user_login()
                    .map(|login| (login.to_string(), Edge::contribution(repo, entry.contributions)))
            })
            .collect();
        tracing::debug!(
            repo = %repo,
            page = page_number,
            entries = entries.len(),
            users = actors.len(),
            "Fetched contributor page"
        );
        ctx.emit(CrawlProgress::PageFetched {
            repo: repo.to_string(),
            kind,
            page: page_number,
            actors: actors.len(),
        });

        let outcomes = process_page(ctx, repo, kind, actors).await;
        let any_failed = outcomes.iter().any(|o| o.is_failed());
        report.outcomes.extend(outcomes);

        if any_failed && ctx.options.failed_actor_policy == FailedActorPolicy::HoldCheckpoint {
            tracing::warn!(repo = %repo, page = page_number, "Holding checkpoint after failed actors");
            report.status = CrawlStatus::Halted { page: page_number };
            break;
        }

        let position = Position::Page(page_number);
        if checkpoint::save(&ctx.db, repo, kind, &position, u64::from(page_number)).await?
            == SaveOutcome::Saved
        {
            report.checkpoints += 1;
            ctx.emit(CrawlProgress::CheckpointSaved {
                repo: repo.to_string(),
                kind,
                position: position.to_string(),
            });
        }

        page_number += 1;
    }

    finish(ctx, &report);
    Ok(report)
}
