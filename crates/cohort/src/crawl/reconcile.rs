//! Post-crawl comparison against the source's authoritative totals.

use crate::entity::interaction_kind::InteractionKind;
use crate::gateway::Retried;
use crate::progress::CrawlProgress;
use crate::source::RepoRef;
use crate::store::{actor, checkpoint};

use super::context::CrawlContext;
use super::cursor::crawl_cursor;
use super::types::{CrawlError, CrawlReport};

/// What reconciliation decided for one kind.
#[derive(Debug, Clone)]
pub enum Reconciliation {
    /// Persisted count met the authoritative total.
    Accepted { persisted: u64, authoritative: u64 },
    /// The checkpoint was dropped and the kind crawled once more.
    Recrawled {
        before: u64,
        after: u64,
        authoritative: u64,
        report: Box<CrawlReport>,
    },
    /// No comparison was made.
    Skipped { reason: String },
}

impl Reconciliation {
    /// Persisted count still below the authoritative total after a recrawl.
    pub fn shortfall(&self) -> Option<u64> {
        match self {
            Self::Recrawled {
                after,
                authoritative,
                ..
            } if after < authoritative => Some(authoritative - after),
            _ => None,
        }
    }
}

/// Compare persisted and authoritative counts for a cursor kind, and
/// re-crawl from scratch once if the store is short.
///
/// Runs at most one corrective pass. A shortfall that survives it is
/// logged and left for the next run.
pub async fn reconcile(
    ctx: &CrawlContext,
    repo: &RepoRef,
    kind: InteractionKind,
) -> Result<Reconciliation, CrawlError> {
    let label = format!("{repo} totals");
    let totals = match ctx
        .gateway
        .execute(&label, || ctx.client.repository_totals(repo))
        .await
    {
        Ok(Retried::Done(totals)) => totals,
        Ok(Retried::GaveUp(failure)) => {
            return Ok(skipped(repo, kind, failure.to_string()));
        }
        Err(e) => return Ok(skipped(repo, kind, e.to_string())),
    };

    let Some(authoritative) = totals.get(kind) else {
        return Ok(skipped(repo, kind, format!("no total for {kind}")));
    };

    let persisted = actor::count_for(&ctx.db, repo, kind).await?;
    if persisted >= authoritative {
        tracing::info!(repo = %repo, kind = %kind, persisted, authoritative, "Reconciled");
        ctx.emit(CrawlProgress::ReconcileAccepted {
            repo: repo.to_string(),
            kind,
            persisted,
            authoritative,
        });
        return Ok(Reconciliation::Accepted {
            persisted,
            authoritative,
        });
    }

    tracing::warn!(
        repo = %repo,
        kind = %kind,
        persisted,
        authoritative,
        "Persisted count below source total, re-crawling from the start"
    );
    ctx.emit(CrawlProgress::ReconcileMismatch {
        repo: repo.to_string(),
        kind,
        persisted,
        authoritative,
    });

    checkpoint::delete(&ctx.db, repo, kind).await?;
    let report = crawl_cursor(ctx, repo, kind).await?;
    let after = actor::count_for(&ctx.db, repo, kind).await?;

    if after < authoritative {
        tracing::warn!(
            repo = %repo,
            kind = %kind,
            persisted = after,
            authoritative,
            "Shortfall remains after corrective pass"
        );
    }

    Ok(Reconciliation::Recrawled {
        before: persisted,
        after,
        authoritative,
        report: Box::new(report),
    })
}

fn skipped(repo: &RepoRef, kind: InteractionKind, reason: String) -> Reconciliation {
    tracing::warn!(repo = %repo, kind = %kind, reason, "Skipping reconciliation");
    Reconciliation::Skipped { reason }
}
