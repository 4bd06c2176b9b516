//! Configuration file support for cohort.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `COHORT_`, nested keys joined by
//!    `__`, e.g. `COHORT_DATABASE__URL`, `COHORT_CRAWL__PAGE_SIZE`)
//! 3. Config file (./cohort.toml over ~/.config/cohort/config.toml)
//! 4. Built-in defaults
//!
//! A GitHub token missing from all of the above is read from `GITHUB_TOKEN`.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/cohort/cohort.db"  # optional, this is the default
//!
//! [github]
//! token = "ghp_..."  # or COHORT_GITHUB__TOKEN / GITHUB_TOKEN
//!
//! [crawl]
//! concurrency = 5
//! page_size = 100
//! event_pages = 3
//! hold_failed_pages = false
//! social = true
//! request_timeout_secs = 30
//! requests_per_second = 10
//! no_rate_limit = false
//! max_attempts = 5
//! ```

use std::path::PathBuf;

use config::{Config as ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use directories::ProjectDirs;
use serde::Deserialize;

use cohort::crawl::{DEFAULT_BATCH_WIDTH, DEFAULT_PAGE_SIZE};
use cohort::enrich::DEFAULT_EVENT_PAGES;
use cohort::gateway::{DEFAULT_MAX_ATTEMPTS, GITHUB_DEFAULT_RPS};

/// Environment variable consulted when no token is configured.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub crawl: CrawlConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

/// GitHub configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub token: Option<String>,
    /// Override for the API base URL (GitHub Enterprise, test servers).
    pub api_base: Option<String>,
}

/// Default crawl options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Actors enriched concurrently within a page.
    pub concurrency: usize,
    pub page_size: u32,
    /// Event history pages scanned per actor for a commit email.
    pub event_pages: u32,
    /// Keep the checkpoint on a page with a failed actor instead of skipping it.
    pub hold_failed_pages: bool,
    /// Whether to fetch secondary social profiles.
    pub social: bool,
    pub request_timeout_secs: u64,
    /// Proactive request pacing, ahead of any server-side limit.
    pub requests_per_second: u32,
    /// Whether to disable proactive pacing.
    pub no_rate_limit: bool,
    /// Attempts per source call before it is given up.
    pub max_attempts: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_BATCH_WIDTH,
            page_size: DEFAULT_PAGE_SIZE,
            event_pages: DEFAULT_EVENT_PAGES,
            hold_failed_pages: false,
            social: true,
            request_timeout_secs: 30,
            requests_per_second: GITHUB_DEFAULT_RPS,
            no_rate_limit: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. XDG config file (~/.config/cohort/config.toml)
    /// 2. Local config file (./cohort.toml)
    /// 3. Environment variables with COHORT_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("cohort.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./cohort.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(Self::environment());

        Self::from_builder(builder)
    }

    /// `COHORT_` prefixed environment variables, e.g.
    /// `COHORT_CRAWL__PAGE_SIZE` -> `crawl.page_size`.
    fn environment() -> Environment {
        Environment::with_prefix("COHORT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Build and deserialize, falling back to defaults on any error.
    fn from_builder(builder: config::ConfigBuilder<DefaultState>) -> Self {
        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter opens the SQLite file read-write and creates
    /// it if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("cohort.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// The configured GitHub token, else `GITHUB_TOKEN`.
    pub fn github_token(&self) -> Option<String> {
        resolve_token(
            self.github.token.clone(),
            std::env::var(GITHUB_TOKEN_ENV).ok(),
        )
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "cohort").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/cohort` or `~/.local/state/cohort`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "cohort").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

/// First non-blank of the configured token and the fallback.
fn resolve_token(configured: Option<String>, fallback: Option<String>) -> Option<String> {
    configured
        .filter(|t| !t.trim().is_empty())
        .or_else(|| fallback.filter(|t| !t.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database.url.is_none());
        assert!(config.github.token.is_none());
        assert!(config.github.api_base.is_none());
        assert_eq!(config.crawl.concurrency, DEFAULT_BATCH_WIDTH);
        assert_eq!(config.crawl.page_size, 100);
        assert_eq!(config.crawl.event_pages, 3);
        assert!(!config.crawl.hold_failed_pages);
        assert!(config.crawl.social);
        assert!(!config.crawl.no_rate_limit);
        assert_eq!(config.crawl.max_attempts, 5);
    }

    #[test]
    fn test_config_builder_with_toml_string() {
        let toml_content = r#"
            [database]
            url = "sqlite://test.db"

            [github]
            token = "ghp_test"

            [crawl]
            concurrency = 8
            hold_failed_pages = true
        "#;

        let builder = ConfigBuilder::builder()
            .add_source(config::File::from_str(toml_content, FileFormat::Toml));
        let config = Config::from_builder(builder);

        assert_eq!(config.database.url.as_deref(), Some("sqlite://test.db"));
        assert_eq!(config.github.token.as_deref(), Some("ghp_test"));
        assert_eq!(config.crawl.concurrency, 8);
        assert!(config.crawl.hold_failed_pages);
        // Unset keys keep their defaults
        assert_eq!(config.crawl.page_size, 100);
        assert!(config.crawl.social);
    }

    #[test]
    fn test_config_file_on_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("cohort.toml");
        let mut file = std::fs::File::create(&path).expect("create config");
        writeln!(file, "[crawl]\npage_size = 25\nsocial = false").expect("write config");

        let builder = ConfigBuilder::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false));
        let config = Config::from_builder(builder);

        assert_eq!(config.crawl.page_size, 25);
        assert!(!config.crawl.social);
    }

    #[test]
    fn test_config_merging_order() {
        let base = r#"
            [crawl]
            concurrency = 2
            page_size = 50
        "#;
        let local = r#"
            [crawl]
            concurrency = 10
        "#;

        let builder = ConfigBuilder::builder()
            .add_source(config::File::from_str(base, FileFormat::Toml))
            .add_source(config::File::from_str(local, FileFormat::Toml));
        let config = Config::from_builder(builder);

        assert_eq!(config.crawl.concurrency, 10);
        assert_eq!(config.crawl.page_size, 50);
    }

    #[test]
    fn test_config_invalid_toml_falls_back_to_defaults() {
        let builder = ConfigBuilder::builder()
            .add_source(config::File::from_str("[crawl\npage_size = ", FileFormat::Toml));
        let config = Config::from_builder(builder);
        assert_eq!(config.crawl.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_config_wrong_type_falls_back_to_defaults() {
        let builder = ConfigBuilder::builder().add_source(config::File::from_str(
            "[crawl]\npage_size = \"lots\"",
            FileFormat::Toml,
        ));
        let config = Config::from_builder(builder);
        assert_eq!(config.crawl.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_config_unknown_fields_ignored() {
        let builder = ConfigBuilder::builder().add_source(config::File::from_str(
            "[gitlab]\nhost = \"gitlab.com\"\n[github]\ntoken = \"t\"",
            FileFormat::Toml,
        ));
        let config = Config::from_builder(builder);
        assert_eq!(config.github.token.as_deref(), Some("t"));
    }

    #[test]
    fn test_database_url_respects_configured_value() {
        let config = Config {
            database: DatabaseConfig {
                url: Some("postgres://localhost/cohort".to_string()),
            },
            ..Config::default()
        };
        assert_eq!(
            config.database_url().as_deref(),
            Some("postgres://localhost/cohort")
        );
    }

    #[test]
    fn test_database_url_defaults_to_state_dir() {
        let config = Config::default();
        let url = config.database_url().expect("default url");
        assert!(url.starts_with("sqlite://"));
        assert!(url.contains("cohort.db"));
        assert!(url.ends_with("?mode=rwc"));
    }

    #[test]
    fn test_default_state_dir() {
        let path = Config::default_state_dir().expect("state dir");
        assert!(path.to_string_lossy().contains("cohort"));
    }

    #[test]
    fn test_resolve_token_prefers_configured() {
        assert_eq!(
            resolve_token(Some("ghp_config".into()), Some("ghp_env".into())).as_deref(),
            Some("ghp_config")
        );
    }

    #[test]
    fn test_resolve_token_falls_back_past_blank_values() {
        assert_eq!(
            resolve_token(Some("  ".into()), Some("ghp_env".into())).as_deref(),
            Some("ghp_env")
        );
        assert_eq!(resolve_token(None, Some(String::new())), None);
        assert_eq!(resolve_token(None, None), None);
    }
}
