use sea_orm::DatabaseConnection;

use cohort::store::checkpoint;
use cohort::{InteractionKind, RepoRef, StoreError};

/// Delete the checkpoints of `repo`, or only the one for `kind`.
/// Returns the kinds whose checkpoint was removed.
pub(crate) async fn reset_checkpoints(
    db: &DatabaseConnection,
    repo: &RepoRef,
    kind: Option<InteractionKind>,
) -> Result<Vec<InteractionKind>, StoreError> {
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => InteractionKind::ALL.to_vec(),
    };

    let mut removed = Vec::new();
    for kind in kinds {
        if checkpoint::delete(db, repo, kind).await? {
            removed.push(kind);
        }
    }
    Ok(removed)
}

pub(crate) async fn handle_reset(
    repo: &str,
    kind: Option<InteractionKind>,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = RepoRef::parse(repo)?;
    let db = cohort::connect_and_migrate(database_url).await?;
    let removed = reset_checkpoints(&db, &repo, kind).await?;

    if removed.is_empty() {
        println!("No checkpoints stored for {repo}.");
    } else {
        let kinds: Vec<&str> = removed.iter().map(|k| k.as_str()).collect();
        println!(
            "Reset {repo} ({}); the next crawl starts from the beginning.",
            kinds.join(", ")
        );
    }

    Ok(())
}
