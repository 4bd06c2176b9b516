//! Crawl checkpoints.
//!
//! A checkpoint is only ever written after a page's whole actor batch has
//! settled, and a save that would move the position backwards is refused.

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::OnConflict,
};
use uuid::Uuid;

use crate::entity::crawl_checkpoint::{self, Entity as CrawlCheckpoint};
use crate::entity::interaction_kind::InteractionKind;
use crate::retry::with_db_retry;
use crate::source::RepoRef;

use super::errors::{Result, StoreError};

/// Where a crawl resumes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// Opaque end cursor of the last completed page.
    Cursor(String),
    /// Number of the last completed page (1-based).
    Page(u32),
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cursor(cursor) => write!(f, "cursor {cursor}"),
            Self::Page(page) => write!(f, "page {page}"),
        }
    }
}

/// A persisted resume position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub repo: RepoRef,
    pub kind: InteractionKind,
    pub position: Position,
    /// Pages completed since the checkpoint was created; orders positions.
    pub pages_completed: u64,
    pub last_scraped_at: DateTime<Utc>,
}

impl TryFrom<crawl_checkpoint::Model> for Checkpoint {
    type Error = StoreError;

    fn try_from(model: crawl_checkpoint::Model) -> Result<Self> {
        let malformed = |reason| StoreError::MalformedCheckpoint {
            owner: model.repository_owner.clone(),
            name: model.repository_name.clone(),
            kind: model.interaction_type,
            reason,
        };

        let position = if model.interaction_type.is_cursor_paginated() {
            match &model.last_completed_cursor {
                Some(cursor) => Position::Cursor(cursor.clone()),
                None => return Err(malformed("missing cursor")),
            }
        } else {
            match model.last_completed_page.map(u32::try_from) {
                Some(Ok(page)) => Position::Page(page),
                Some(Err(_)) => return Err(malformed("negative page")),
                None => return Err(malformed("missing page")),
            }
        };

        Ok(Self {
            repo: RepoRef::new(model.repository_owner, model.repository_name),
            kind: model.interaction_type,
            position,
            pages_completed: u64::try_from(model.pages_completed).unwrap_or(0),
            last_scraped_at: model.last_scraped_at.with_timezone(&Utc),
        })
    }
}

/// Result of [`save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The stored position is ahead of the one offered; nothing was written.
    Rejected { stored: Position, offered: Position },
}

/// Ordering key of a position: page number for pages, pages completed
/// for cursors.
fn rank(position: &Position, pages_completed: u64) -> u64 {
    match position {
        Position::Page(page) => u64::from(*page),
        Position::Cursor(_) => pages_completed,
    }
}

/// Load the checkpoint for `(repo, kind)`.
pub async fn load(
    db: &DatabaseConnection,
    repo: &RepoRef,
    kind: InteractionKind,
) -> Result<Option<Checkpoint>> {
    let model = CrawlCheckpoint::find()
        .filter(crawl_checkpoint::Column::RepositoryOwner.eq(repo.owner.as_str()))
        .filter(crawl_checkpoint::Column::RepositoryName.eq(repo.name.as_str()))
        .filter(crawl_checkpoint::Column::InteractionType.eq(kind))
        .one(db)
        .await?;

    model.map(Checkpoint::try_from).transpose()
}

/// Persist a new position for `(repo, kind)`.
///
/// A position ranked below the stored one is refused with
/// [`SaveOutcome::Rejected`]; equal or higher positions overwrite it.
pub async fn save(
    db: &DatabaseConnection,
    repo: &RepoRef,
    kind: InteractionKind,
    position: &Position,
    pages_completed: u64,
) -> Result<SaveOutcome> {
    if let Some(stored) = load(db, repo, kind).await?
        && rank(position, pages_completed) < rank(&stored.position, stored.pages_completed)
    {
        tracing::warn!(
            repo = %repo,
            kind = %kind,
            stored = %stored.position,
            offered = %position,
            "Refusing to move checkpoint backwards"
        );
        return Ok(SaveOutcome::Rejected {
            stored: stored.position,
            offered: position.clone(),
        });
    }

    let (cursor, page) = match position {
        Position::Cursor(cursor) => (Some(cursor.clone()), None),
        Position::Page(page) => (None, Some(i32::try_from(*page).unwrap_or(i32::MAX))),
    };

    let model = crawl_checkpoint::ActiveModel {
        id: Set(Uuid::new_v4()),
        repository_owner: Set(repo.owner.clone()),
        repository_name: Set(repo.name.clone()),
        interaction_type: Set(kind),
        last_completed_cursor: Set(cursor),
        last_completed_page: Set(page),
        pages_completed: Set(i64::try_from(pages_completed).unwrap_or(i64::MAX)),
        last_scraped_at: Set(Utc::now().fixed_offset()),
    };

    with_db_retry("save checkpoint", || {
        let model = model.clone();
        async move {
            CrawlCheckpoint::insert(model)
                .on_conflict(
                    OnConflict::columns([
                        crawl_checkpoint::Column::RepositoryOwner,
                        crawl_checkpoint::Column::RepositoryName,
                        crawl_checkpoint::Column::InteractionType,
                    ])
                    .update_columns([
                        crawl_checkpoint::Column::LastCompletedCursor,
                        crawl_checkpoint::Column::LastCompletedPage,
                        crawl_checkpoint::Column::PagesCompleted,
                        crawl_checkpoint::Column::LastScrapedAt,
                    ])
                    .to_owned(),
                )
                .exec_without_returning(db)
                .await
        }
    })
    .await?;

    Ok(SaveOutcome::Saved)
}

/// Delete the checkpoint for `(repo, kind)`. Returns whether one existed.
pub async fn delete(db: &DatabaseConnection, repo: &RepoRef, kind: InteractionKind) -> Result<bool> {
    let result = CrawlCheckpoint::delete_many()
        .filter(crawl_checkpoint::Column::RepositoryOwner.eq(repo.owner.as_str()))
        .filter(crawl_checkpoint::Column::RepositoryName.eq(repo.name.as_str()))
        .filter(crawl_checkpoint::Column::InteractionType.eq(kind))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// All checkpoints of `repo`, ordered by kind.
pub async fn list_for_repo(db: &DatabaseConnection, repo: &RepoRef) -> Result<Vec<Checkpoint>> {
    CrawlCheckpoint::find()
        .filter(crawl_checkpoint::Column::RepositoryOwner.eq(repo.owner.as_str()))
        .filter(crawl_checkpoint::Column::RepositoryName.eq(repo.name.as_str()))
        .order_by_asc(crawl_checkpoint::Column::InteractionType)
        .all(db)
        .await?
        .into_iter()
        .map(Checkpoint::try_from)
        .collect()
}
