//! Actor interaction entity - the edges between actors and repositories.
//!
//! `(actor_login, interaction_type, repository_owner, repository_name)` is
//! unique, so revisiting an edge never duplicates it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::interaction_kind::InteractionKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "actor_interactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub actor_login: String,
    pub interaction_type: InteractionKind,
    pub repository_owner: String,
    pub repository_name: String,

    /// Contribution count for `contribute` edges; `None` otherwise.
    pub weight: Option<i64>,

    pub first_seen_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::actor::Entity",
        from = "Column::ActorLogin",
        to = "super::actor::Column::Login"
    )]
    Actor,
}

impl Related<super::actor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Actor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
