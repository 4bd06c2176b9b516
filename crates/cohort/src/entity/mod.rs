//! SeaORM entity definitions for the cohort database schema.

pub mod actor;
pub mod actor_interaction;
pub mod crawl_checkpoint;
pub mod interaction_kind;
pub mod prelude;
