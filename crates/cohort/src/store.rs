//! Persistence of actors, edges, and crawl checkpoints.
//!
//! Every write is an upsert keyed on a natural key, so concurrent batch
//! writers never need a transaction or a lock.

pub mod actor;
pub mod checkpoint;
mod errors;

pub use checkpoint::{Checkpoint, Position, SaveOutcome};
pub use errors::{Result, StoreError};

#[cfg(all(test, feature = "migrate", feature = "sqlite"))]
pub(crate) async fn memory_db() -> sea_orm::DatabaseConnection {
    crate::db::connect_and_migrate("sqlite::memory:")
        .await
        .expect("in-memory database")
}
