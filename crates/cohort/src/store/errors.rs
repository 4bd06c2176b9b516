use sea_orm::DbErr;
use thiserror::Error;

use crate::entity::interaction_kind::InteractionKind;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// A stored checkpoint row does not carry the position its kind needs.
    #[error("Malformed checkpoint for {owner}/{name} ({kind}): {reason}")]
    MalformedCheckpoint {
        owner: String,
        name: String,
        kind: InteractionKind,
        reason: &'static str,
    },
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
