use cohort::db;
use cohort::migration::{Migrator, MigratorTrait};

use crate::MigrateAction;

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(&db).await?.len();
            if pending == 0 {
                println!("Schema is up to date.");
            } else {
                println!("Applying {pending} migration(s)...");
                Migrator::up(&db, None).await?;
                println!("Schema is up to date.");
            }
        }
        MigrateAction::Down { steps } => {
            println!("Rolling back {steps} migration(s)...");
            Migrator::down(&db, Some(steps)).await?;
            println!("Rollback complete.");
        }
        MigrateAction::Status => {
            let applied = Migrator::get_applied_migrations(&db).await?.len();
            let pending = Migrator::get_pending_migrations(&db).await?.len();
            println!("Applied: {applied}, pending: {pending}");
            Migrator::status(&db).await?;
        }
        MigrateAction::Fresh => {
            println!("Dropping actors, interactions, and checkpoints...");
            Migrator::fresh(&db).await?;
            println!("Fresh schema applied.");
        }
    }

    Ok(())
}
