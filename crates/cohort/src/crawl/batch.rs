//! Bounded fan-out of one page of actors.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::task::JoinSet;

use crate::enrich::Enricher;
use crate::entity::interaction_kind::InteractionKind;
use crate::progress::CrawlProgress;
use crate::record::Edge;
use crate::source::{RepoRef, short_error_message};
use crate::store::actor;

use super::context::CrawlContext;
use super::types::ActorOutcome;

/// Enrich and persist every actor of a page.
///
/// Actors are processed in batches of `batch_width`; each batch is joined
/// in full before the next one starts. Outcomes come back in input order,
/// one per actor.
pub(crate) async fn process_page(
    ctx: &CrawlContext,
    repo: &RepoRef,
    kind: InteractionKind,
    actors: Vec<(String, Edge)>,
) -> Vec<ActorOutcome> {
    let width = ctx.options.batch_width.max(1);
    let mut outcomes = Vec::with_capacity(actors.len());

    for batch in actors.chunks(width) {
        let mut join_set: JoinSet<(usize, ActorOutcome)> = JoinSet::new();

        for (index, (login, edge)) in batch.iter().enumerate() {
            let enricher = ctx.enricher.clone();
            let db = Arc::clone(&ctx.db);
            let login = login.clone();
            let edge = edge.clone();
            join_set.spawn(async move { (index, sync_actor(enricher, db, login, edge).await) });
        }

        let mut settled: Vec<Option<ActorOutcome>> = vec![None; batch.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => settled[index] = Some(outcome),
                Err(e) => tracing::error!(repo = %repo, kind = %kind, error = %e, "Actor task panicked"),
            }
        }

        for (slot, (login, _)) in settled.into_iter().zip(batch) {
            let outcome = slot.unwrap_or_else(|| ActorOutcome::Failed {
                login: login.clone(),
                error: "task panicked".to_string(),
            });
            report(ctx, repo, kind, &outcome);
            outcomes.push(outcome);
        }
    }

    outcomes
}

async fn sync_actor(
    enricher: Enricher,
    db: Arc<DatabaseConnection>,
    login: String,
    edge: Edge,
) -> ActorOutcome {
    let record = match enricher.enrich(&login).await {
        Ok(record) => record,
        Err(e) => {
            return ActorOutcome::Failed {
                login,
                error: short_error_message(&e),
            };
        }
    };

    match actor::upsert(&db, &record, &edge).await {
        Ok(()) => ActorOutcome::Synced { login },
        Err(e) => ActorOutcome::Failed {
            login,
            error: short_error_message(&e),
        },
    }
}

fn report(ctx: &CrawlContext, repo: &RepoRef, kind: InteractionKind, outcome: &ActorOutcome) {
    match outcome {
        ActorOutcome::Synced { login } => {
            tracing::debug!(repo = %repo, kind = %kind, login, "Actor synced");
            ctx.emit(CrawlProgress::ActorSynced {
                repo: repo.to_string(),
                kind,
                login: login.clone(),
            });
        }
        ActorOutcome::Failed { login, error } => {
            tracing::warn!(repo = %repo, kind = %kind, login, error, "Actor failed");
            ctx.emit(CrawlProgress::ActorFailed {
                repo: repo.to_string(),
                kind,
                login: login.clone(),
                error: error.clone(),
            });
        }
    }
}
