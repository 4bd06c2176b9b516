use clap::ValueEnum;
use sea_orm::DatabaseConnection;

use cohort::store::{actor, checkpoint};
use cohort::{InteractionKind, RepoRef, StoreError};

/// Output format for status display.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Crawl state of one interaction kind.
#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct KindStatus {
    #[tabled(rename = "Kind")]
    pub kind: InteractionKind,
    #[tabled(rename = "Stored")]
    pub stored: u64,
    #[tabled(rename = "Resume From", display_with = "display_optional")]
    pub position: Option<String>,
    #[tabled(rename = "Pages Done")]
    pub pages_completed: u64,
    #[tabled(rename = "Last Scraped", display_with = "display_optional")]
    pub last_scraped_at: Option<String>,
}

fn display_optional(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

/// Stored counts and checkpoints for every kind of `repo`.
pub(crate) async fn collect_status(
    db: &DatabaseConnection,
    repo: &RepoRef,
) -> Result<Vec<KindStatus>, StoreError> {
    let checkpoints = checkpoint::list_for_repo(db, repo).await?;
    let mut rows = Vec::with_capacity(InteractionKind::ALL.len());

    for kind in InteractionKind::ALL {
        let stored = actor::count_for(db, repo, kind).await?;
        let saved = checkpoints.iter().find(|c| c.kind == kind);
        rows.push(KindStatus {
            kind,
            stored,
            position: saved.map(|c| c.position.to_string()),
            pages_completed: saved.map_or(0, |c| c.pages_completed),
            last_scraped_at: saved
                .map(|c| c.last_scraped_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        });
    }

    Ok(rows)
}

pub(crate) async fn handle_status(
    repo: &str,
    output: OutputFormat,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = RepoRef::parse(repo)?;
    let db = cohort::connect_and_migrate(database_url).await?;
    let rows = collect_status(&db, &repo).await?;

    match output {
        OutputFormat::Table => {
            println!("{repo}");
            let mut table = tabled::Table::new(rows);
            table.with(tabled::settings::Style::rounded());
            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use cohort::store::Position;
    use cohort::{ActorRecord, Edge};

    use super::*;

    #[test]
    fn output_format_defaults_to_table() {
        assert!(matches!(OutputFormat::default(), OutputFormat::Table));
    }

    #[tokio::test]
    async fn status_reports_counts_and_checkpoints_per_kind() {
        let db = cohort::connect_and_migrate("sqlite::memory:")
            .await
            .expect("in-memory database");
        let repo = RepoRef::new("rust-lang", "rust");

        actor::upsert(
            &db,
            &ActorRecord::handle_only("octocat"),
            &Edge::new(InteractionKind::Star, &repo),
        )
        .await
        .expect("upsert");
        checkpoint::save(&db, &repo, InteractionKind::Star, &Position::Cursor("c1".into()), 1)
            .await
            .expect("save checkpoint");

        let rows = collect_status(&db, &repo).await.expect("status");
        assert_eq!(rows.len(), 4);

        let star = &rows[0];
        assert_eq!(star.kind, InteractionKind::Star);
        assert_eq!(star.stored, 1);
        assert_eq!(star.position.as_deref(), Some("cursor c1"));
        assert_eq!(star.pages_completed, 1);
        assert!(star.last_scraped_at.is_some());

        let fork = &rows[2];
        assert_eq!(fork.kind, InteractionKind::Fork);
        assert_eq!(fork.stored, 0);
        assert!(fork.position.is_none());
    }

    #[test]
    fn json_output_uses_lowercase_kinds() {
        let row = KindStatus {
            kind: InteractionKind::Contribute,
            stored: 3,
            position: Some("page 2".into()),
            pages_completed: 2,
            last_scraped_at: None,
        };
        let json = serde_json::to_value(&row).expect("serialize");
        assert_eq!(json["kind"], "contribute");
        assert_eq!(json["position"], "page 2");
    }
}
