//! Actor upserts and per-repository counts.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    sea_query::OnConflict,
};
use uuid::Uuid;

use crate::entity::actor::{self, Entity as Actor};
use crate::entity::actor_interaction::{self, Entity as ActorInteraction};
use crate::entity::interaction_kind::InteractionKind;
use crate::record::{ActorDocument, ActorRecord, Edge};
use crate::retry::with_db_retry;
use crate::source::RepoRef;

use super::errors::Result;

/// Scalar columns overwritten on every sighting.
const REFRESHED_COLUMNS: [actor::Column; 17] = [
    actor::Column::ProfileUrl,
    actor::Column::Name,
    actor::Column::Bio,
    actor::Column::Company,
    actor::Column::Blog,
    actor::Column::Location,
    actor::Column::Email,
    actor::Column::TwitterUsername,
    actor::Column::Followers,
    actor::Column::Following,
    actor::Column::PublicRepos,
    actor::Column::AccountCreatedAt,
    actor::Column::SocialUrl,
    actor::Column::SocialBio,
    actor::Column::SocialName,
    actor::Column::SocialLocation,
    actor::Column::UpdatedAt,
];

fn actor_model(record: &ActorRecord, now: DateTime<FixedOffset>) -> actor::ActiveModel {
    actor::ActiveModel {
        id: Set(Uuid::new_v4()),
        login: Set(record.login.clone()),
        profile_url: Set(record.profile_url.clone()),
        name: Set(record.name.clone()),
        bio: Set(record.bio.clone()),
        company: Set(record.company.clone()),
        blog: Set(record.blog.clone()),
        location: Set(record.location.clone()),
        email: Set(record.email.clone()),
        twitter_username: Set(record.twitter_username.clone()),
        followers: Set(record.followers),
        following: Set(record.following),
        public_repos: Set(record.public_repos),
        account_created_at: Set(record.account_created_at.map(|t| t.fixed_offset())),
        social_url: Set(record.social_url.clone()),
        social_bio: Set(record.social_bio.clone()),
        social_name: Set(record.social_name.clone()),
        social_location: Set(record.social_location.clone()),
        first_seen_at: Set(now),
        updated_at: Set(now),
    }
}

fn edge_model(
    login: &str,
    edge: &Edge,
    now: DateTime<FixedOffset>,
) -> actor_interaction::ActiveModel {
    actor_interaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        actor_login: Set(login.to_string()),
        interaction_type: Set(edge.kind),
        repository_owner: Set(edge.repository_owner.clone()),
        repository_name: Set(edge.repository_name.clone()),
        weight: Set(edge.weight),
        first_seen_at: Set(now),
    }
}

/// Merge `record` into the store and tag it with `edge`.
///
/// Scalar fields are overwritten with the values in `record`. The edge is
/// added unless an edge with the same kind and repository already exists,
/// in which case only its weight is refreshed. Applying the same pair twice
/// leaves the store as applying it once.
pub async fn upsert(db: &DatabaseConnection, record: &ActorRecord, edge: &Edge) -> Result<()> {
    let now = Utc::now().fixed_offset();

    let model = actor_model(record, now);
    with_db_retry("upsert actor", || {
        let model = model.clone();
        async move {
            Actor::insert(model)
                .on_conflict(
                    OnConflict::column(actor::Column::Login)
                        .update_columns(REFRESHED_COLUMNS)
                        .to_owned(),
                )
                .exec_without_returning(db)
                .await
        }
    })
    .await?;

    let model = edge_model(&record.login, edge, now);
    with_db_retry("upsert edge", || {
        let model = model.clone();
        async move {
            ActorInteraction::insert(model)
                .on_conflict(
                    OnConflict::columns([
                        actor_interaction::Column::ActorLogin,
                        actor_interaction::Column::InteractionType,
                        actor_interaction::Column::RepositoryOwner,
                        actor_interaction::Column::RepositoryName,
                    ])
                    .update_column(actor_interaction::Column::Weight)
                    .to_owned(),
                )
                .exec_without_returning(db)
                .await
        }
    })
    .await?;

    tracing::trace!(
        login = %record.login,
        kind = %edge.kind,
        repo = %format!("{}/{}", edge.repository_owner, edge.repository_name),
        "Upserted actor"
    );

    Ok(())
}

/// Load an actor and all of its edges.
pub async fn find_document(db: &DatabaseConnection, login: &str) -> Result<Option<ActorDocument>> {
    let Some(model) = Actor::find()
        .filter(actor::Column::Login.eq(login))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let interactions = ActorInteraction::find()
        .filter(actor_interaction::Column::ActorLogin.eq(login))
        .order_by_asc(actor_interaction::Column::RepositoryOwner)
        .order_by_asc(actor_interaction::Column::RepositoryName)
        .order_by_asc(actor_interaction::Column::InteractionType)
        .all(db)
        .await?
        .into_iter()
        .map(|m| Edge {
            kind: m.interaction_type,
            repository_owner: m.repository_owner,
            repository_name: m.repository_name,
            weight: m.weight,
        })
        .collect();

    Ok(Some(ActorDocument {
        record: record_from_model(model),
        interactions,
    }))
}

fn record_from_model(model: actor::Model) -> ActorRecord {
    ActorRecord {
        login: model.login,
        profile_url: model.profile_url,
        name: model.name,
        bio: model.bio,
        company: model.company,
        blog: model.blog,
        location: model.location,
        email: model.email,
        twitter_username: model.twitter_username,
        followers: model.followers,
        following: model.following,
        public_repos: model.public_repos,
        account_created_at: model.account_created_at.map(|t| t.with_timezone(&Utc)),
        social_url: model.social_url,
        social_bio: model.social_bio,
        social_name: model.social_name,
        social_location: model.social_location,
    }
}

/// Number of distinct actors tagged with `(repo, kind)`.
pub async fn count_for(
    db: &DatabaseConnection,
    repo: &RepoRef,
    kind: InteractionKind,
) -> Result<u64> {
    let count = ActorInteraction::find()
        .filter(actor_interaction::Column::RepositoryOwner.eq(repo.owner.as_str()))
        .filter(actor_interaction::Column::RepositoryName.eq(repo.name.as_str()))
        .filter(actor_interaction::Column::InteractionType.eq(kind))
        .count(db)
        .await?;
    Ok(count)
}

/// Persisted actor counts for every interaction kind of `repo`.
pub async fn totals(
    db: &DatabaseConnection,
    repo: &RepoRef,
) -> Result<Vec<(InteractionKind, u64)>> {
    let mut totals = Vec::with_capacity(InteractionKind::ALL.len());
    for kind in InteractionKind::ALL {
        totals.push((kind, count_for(db, repo, kind).await?));
    }
    Ok(totals)
}

/// Total number of actors in the store.
pub async fn count_all(db: &DatabaseConnection) -> Result<u64> {
    Ok(Actor::find().count(db).await?)
}
