//! Crawl checkpoint entity - the resume position of one crawl.
//!
//! Keyed by `(repository_owner, repository_name, interaction_type)`.
//! Cursor-paginated kinds store `last_completed_cursor`; the contributor
//! listing stores `last_completed_page`. `pages_completed` orders positions
//! so a save can be checked against regression even for opaque cursors.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::interaction_kind::InteractionKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "crawl_checkpoints")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub repository_owner: String,
    pub repository_name: String,
    pub interaction_type: InteractionKind,

    #[sea_orm(column_type = "Text", nullable)]
    pub last_completed_cursor: Option<String>,
    pub last_completed_page: Option<i32>,

    /// Pages completed since the checkpoint was created.
    pub pages_completed: i64,

    pub last_scraped_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
