//! Actor entity - one row per account seen by any crawl.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "actors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Unique handle on the source platform.
    #[sea_orm(unique)]
    pub login: String,

    // ─── Primary profile ────────────────────────────────────────────────
    pub profile_url: Option<String>,
    pub name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub location: Option<String>,
    /// Public email, or the best commit-author email found in events.
    pub email: Option<String>,
    pub twitter_username: Option<String>,
    pub followers: Option<i64>,
    pub following: Option<i64>,
    pub public_repos: Option<i64>,
    pub account_created_at: Option<DateTimeWithTimeZone>,

    // ─── Secondary social profile ───────────────────────────────────────
    pub social_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub social_bio: Option<String>,
    pub social_name: Option<String>,
    pub social_location: Option<String>,

    // ─── Bookkeeping ────────────────────────────────────────────────────
    pub first_seen_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::actor_interaction::Entity")]
    Interactions,
}

impl Related<super::actor_interaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Interactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
