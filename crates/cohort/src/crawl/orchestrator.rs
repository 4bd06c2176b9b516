//! Sequencing of kinds per repository and repositories per run.

use crate::entity::interaction_kind::InteractionKind;
use crate::progress::CrawlProgress;
use crate::source::{RepoRef, short_error_message};
use crate::store::actor;

use super::context::CrawlContext;
use super::cursor::crawl_cursor;
use super::paged::crawl_contributors;
use super::reconcile::{Reconciliation, reconcile};
use super::types::{CrawlError, CrawlReport};

/// One kind's crawl plus its reconciliation, if any ran.
#[derive(Debug, Clone)]
pub struct KindReport {
    pub crawl: CrawlReport,
    pub reconciliation: Option<Reconciliation>,
}

/// Everything done for one repository.
#[derive(Debug, Clone)]
pub struct RepositoryReport {
    pub repo: RepoRef,
    pub kinds: Vec<KindReport>,
    /// Persisted actor counts per kind after the run.
    pub totals: Vec<(InteractionKind, u64)>,
    /// Set when the repository failed part-way.
    pub error: Option<String>,
}

impl RepositoryReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Crawl one kind, then reconcile it if it is cursor-paginated and the
/// crawl ran to completion.
pub async fn crawl_kind(
    ctx: &CrawlContext,
    repo: &RepoRef,
    kind: InteractionKind,
) -> Result<KindReport, CrawlError> {
    if !kind.is_cursor_paginated() {
        return Ok(KindReport {
            crawl: crawl_contributors(ctx, repo).await?,
            reconciliation: None,
        });
    }

    let crawl = crawl_cursor(ctx, repo, kind).await?;
    let reconciliation = if crawl.is_complete() {
        reconcile(ctx, repo, kind).await?
    } else {
        Reconciliation::Skipped {
            reason: format!("crawl {}", crawl.status),
        }
    };

    Ok(KindReport {
        crawl,
        reconciliation: Some(reconciliation),
    })
}

/// Run every configured kind of `repo` in order: star, watch, fork,
/// contribute.
pub async fn sync_repository(
    ctx: &CrawlContext,
    repo: &RepoRef,
) -> Result<RepositoryReport, CrawlError> {
    let mut kinds = Vec::new();
    crawl_kinds(ctx, repo, &mut kinds).await?;
    let totals = finish_repository(ctx, repo).await?;

    Ok(RepositoryReport {
        repo: repo.clone(),
        kinds,
        totals,
        error: None,
    })
}

/// Crawl the selected kinds, pushing each finished kind onto `kinds` so a
/// later failure leaves the earlier reports in place.
async fn crawl_kinds(
    ctx: &CrawlContext,
    repo: &RepoRef,
    kinds: &mut Vec<KindReport>,
) -> Result<(), CrawlError> {
    for kind in InteractionKind::ALL
        .into_iter()
        .filter(|k| ctx.options.kinds.contains(k))
    {
        if ctx.options.is_shutdown_requested() {
            break;
        }
        let report = crawl_kind(ctx, repo, kind).await?;
        let shut_down = report.crawl.was_shut_down();
        kinds.push(report);
        if shut_down {
            break;
        }
    }
    Ok(())
}

async fn finish_repository(
    ctx: &CrawlContext,
    repo: &RepoRef,
) -> Result<Vec<(InteractionKind, u64)>, CrawlError> {
    let totals = actor::totals(&ctx.db, repo).await?;
    for (kind, count) in &totals {
        tracing::info!(repo = %repo, kind = %kind, count, "Persisted actors");
    }
    ctx.emit(CrawlProgress::RepositoryFinished {
        repo: repo.to_string(),
        totals: totals.clone(),
    });
    Ok(totals)
}

/// Sync each repository in turn. A failing repository is logged and
/// reported with the kinds it finished; the run moves on to the next one.
pub async fn sync_repositories(ctx: &CrawlContext, repos: &[RepoRef]) -> Vec<RepositoryReport> {
    let mut reports = Vec::with_capacity(repos.len());

    for (index, repo) in repos.iter().enumerate() {
        if ctx.options.is_shutdown_requested() {
            tracing::info!(remaining = repos.len() - index, "Shutdown requested, stopping");
            break;
        }

        ctx.emit(CrawlProgress::RepositoryStarted {
            repo: repo.to_string(),
            index: index + 1,
            total: repos.len(),
        });

        let mut kinds = Vec::new();
        let result = match crawl_kinds(ctx, repo, &mut kinds).await {
            Ok(()) => finish_repository(ctx, repo).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(totals) => reports.push(RepositoryReport {
                repo: repo.clone(),
                kinds,
                totals,
                error: None,
            }),
            Err(e) => {
                let error = short_error_message(&e);
                tracing::error!(repo = %repo, error, completed = kinds.len(), "Repository failed");
                ctx.emit(CrawlProgress::RepositoryFailed {
                    repo: repo.to_string(),
                    error: error.clone(),
                });
                let totals = actor::totals(&ctx.db, repo).await.unwrap_or_else(|e| {
                    tracing::warn!(repo = %repo, error = %e, "Could not count persisted actors");
                    Vec::new()
                });
                reports.push(RepositoryReport {
                    repo: repo.clone(),
                    kinds,
                    totals,
                    error: Some(error),
                });
            }
        }
    }

    reports
}
