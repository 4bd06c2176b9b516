//! Common re-exports for convenient entity usage.

pub use super::actor::{
    ActiveModel as ActorActiveModel, Column as ActorColumn, Entity as Actor, Model as ActorModel,
};
pub use super::actor_interaction::{
    ActiveModel as ActorInteractionActiveModel, Column as ActorInteractionColumn,
    Entity as ActorInteraction, Model as ActorInteractionModel,
};
pub use super::crawl_checkpoint::{
    ActiveModel as CrawlCheckpointActiveModel, Column as CrawlCheckpointColumn,
    Entity as CrawlCheckpoint, Model as CrawlCheckpointModel,
};
pub use super::interaction_kind::InteractionKind;
