//! Cohort CLI - command-line interface for the repository audience crawler.

mod commands;
mod config;
mod progress;
mod shutdown;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use cohort::InteractionKind;

use crate::commands::crawl::CrawlArgs;
use crate::commands::status::OutputFormat;

#[derive(Parser)]
#[command(name = "cohort")]
#[command(version)]
#[command(about = "A resumable crawler for GitHub repository audiences")]
#[command(
    long_about = "Cohort walks the stargazers, watchers, forks, and contributors of GitHub \
repositories, enriches every actor with profile data, and stores the result in a local \
database. Crawls are checkpointed after every page, so an interrupted run picks up where \
it stopped."
)]
#[command(after_long_help = r#"EXAMPLES
    Crawl the audience of a repository:
        $ cohort crawl rust-lang/rust

    Crawl only stargazers and forkers of several repositories:
        $ cohort crawl --only star,fork tokio-rs/tokio https://github.com/serde-rs/serde

    Crawl every repository listed in a file:
        $ cohort crawl --repos-file repos.txt

    Inspect and reset crawl progress:
        $ cohort status rust-lang/rust
        $ cohort reset rust-lang/rust --kind star

    Generate shell completions:
        $ cohort completions bash > ~/.local/share/bash-completion/completions/cohort

CONFIGURATION
    Cohort reads configuration from:
      1. ~/.config/cohort/config.toml (or $XDG_CONFIG_HOME/cohort/config.toml)
      2. ./cohort.toml
      3. Environment variables (COHORT_* prefix, nested keys joined by __)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    COHORT_DATABASE__URL      Database connection string (default: ~/.local/state/cohort/cohort.db)
    COHORT_GITHUB__TOKEN      GitHub personal access token
    GITHUB_TOKEN              Fallback GitHub token
    RUST_LOG                  Log filter (default: cohort=info,cohort_cli=info)
"#)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl and enrich the audience of one or more repositories
    Crawl(CrawlArgs),
    /// Show stored counts and checkpoints of a repository
    Status {
        /// Repository as owner/name or URL
        repo: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Delete checkpoints so the next crawl starts from the beginning
    Reset {
        /// Repository as owner/name or URL
        repo: String,

        /// Only reset this kind (star, watch, fork, contribute)
        #[arg(short, long)]
        kind: Option<InteractionKind>,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Roll back applied migrations
    Down {
        /// Number of migrations to roll back
        #[arg(short = 'n', long, default_value_t = 1)]
        steps: u32,
    },
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

fn init_tracing(verbose: bool) {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::new("cohort=debug,cohort_cli=debug"),
        // Progress bars carry routine events on a terminal
        Err(_) if Term::stdout().is_term() => EnvFilter::new("cohort=warn,cohort_cli=warn"),
        Err(_) => EnvFilter::new("cohort=info,cohort_cli=info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Make sure the directory of a SQLite database file exists.
fn ensure_sqlite_dir(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Completions { shell } = &cli.command {
        commands::meta::handle_completions(*shell)?;
        return Ok(());
    }

    let config = config::Config::load();
    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set COHORT_DATABASE__URL")?;
    ensure_sqlite_dir(&database_url)?;

    match cli.command {
        Commands::Crawl(args) => {
            let shutdown = shutdown::setup_shutdown_handler();
            commands::crawl::handle_crawl(args, &config, &database_url, shutdown).await?;
        }
        Commands::Status { repo, output } => {
            commands::status::handle_status(&repo, output, &database_url).await?;
        }
        Commands::Reset { repo, kind } => {
            commands::reset::handle_reset(&repo, kind, &database_url).await?;
        }
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
