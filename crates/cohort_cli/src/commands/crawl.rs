//! The crawl command: walk every interaction kind of the given repositories.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use console::{Term, style};

use cohort::crawl::{KindReport, Reconciliation};
use cohort::enrich::SocialProfileFetcher;
use cohort::gateway::ApiRateLimiter;
use cohort::http::reqwest_transport::ReqwestTransport;
use cohort::{
    CrawlContext, CrawlOptions, FailedActorPolicy, Gateway, GitHubClient, InteractionKind,
    RepoRef, RepositoryReport, RetryPolicy, connect_and_migrate, sync_repositories,
};

use crate::config::Config;
use crate::progress::ProgressReporter;

/// Options for the crawl command.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CrawlArgs {
    /// Repositories as `owner/name` or full repository URLs
    repos: Vec<String>,

    /// File with one repository per line (`#` starts a comment)
    #[arg(short = 'f', long)]
    repos_file: Option<PathBuf>,

    /// Actors enriched concurrently within a page (default from config or 5)
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,

    /// Actors requested per page (default from config or 100)
    #[arg(short = 'p', long)]
    page_size: Option<u32>,

    /// Event history pages scanned per actor for a commit email
    #[arg(long)]
    event_pages: Option<u32>,

    /// Keep the checkpoint on a page with a failed actor so the next run retries it
    #[arg(long)]
    hold_failed_pages: bool,

    /// Only crawl these kinds (comma-separated: star,watch,fork,contribute)
    #[arg(long, value_delimiter = ',')]
    only: Vec<InteractionKind>,

    /// Don't fetch secondary social profiles
    #[arg(long)]
    no_social: bool,

    /// Disable proactive rate limiting (may cause API throttling)
    #[arg(short = 'R', long)]
    no_rate_limit: bool,

    /// Attempts per API call before it is given up (default from config or 5)
    #[arg(long)]
    max_attempts: Option<u32>,
}

/// One row of the end-of-run summary.
#[derive(Debug, Clone, tabled::Tabled)]
struct KindSummary {
    #[tabled(rename = "Repository")]
    repo: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Synced")]
    synced: usize,
    #[tabled(rename = "Failed")]
    failed: usize,
    #[tabled(rename = "Pages")]
    pages: u32,
    #[tabled(rename = "Stored")]
    stored: String,
    #[tabled(rename = "Reconciliation")]
    reconciliation: String,
}

impl KindSummary {
    fn from_report(report: &RepositoryReport, kind: &KindReport) -> Self {
        let stored = report
            .totals
            .iter()
            .find(|(k, _)| *k == kind.crawl.kind)
            .map(|(_, count)| count.to_string())
            .unwrap_or_else(|| "-".to_string());

        Self {
            repo: report.repo.to_string(),
            kind: kind.crawl.kind.to_string(),
            status: kind.crawl.status.to_string(),
            synced: kind.crawl.synced(),
            failed: kind.crawl.failed(),
            pages: kind.crawl.pages,
            stored,
            reconciliation: describe_reconciliation(kind.reconciliation.as_ref()),
        }
    }
}

fn describe_reconciliation(reconciliation: Option<&Reconciliation>) -> String {
    match reconciliation {
        None => "-".to_string(),
        Some(Reconciliation::Accepted {
            persisted,
            authoritative,
        }) => format!("ok ({persisted}/{authoritative})"),
        Some(recrawled @ Reconciliation::Recrawled {
            after,
            authoritative,
            ..
        }) => match recrawled.shortfall() {
            Some(missing) => format!("short by {missing} ({after}/{authoritative})"),
            None => format!("recrawled ({after}/{authoritative})"),
        },
        Some(Reconciliation::Skipped { reason }) => format!("skipped: {reason}"),
    }
}

/// Parse a repos file: one repository per line, blank lines and `#`
/// comments skipped. Lines that don't name a repository are warned about
/// and skipped.
pub(crate) fn parse_repo_list(content: &str) -> Vec<RepoRef> {
    content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                return None;
            }
            match RepoRef::parse(line) {
                Ok(repo) => Some(repo),
                Err(e) => {
                    tracing::warn!(line = index + 1, error = %e, "Skipping invalid repository line");
                    None
                }
            }
        })
        .collect()
}

/// Drop repeated repositories, keeping first occurrences in order.
fn dedupe(repos: Vec<RepoRef>) -> Vec<RepoRef> {
    let mut seen = std::collections::HashSet::new();
    repos
        .into_iter()
        .filter(|repo| seen.insert(repo.clone()))
        .collect()
}

/// Repositories named on the command line and in the repos file.
fn collect_repos(args: &CrawlArgs) -> Result<Vec<RepoRef>, Box<dyn std::error::Error>> {
    let mut repos = args
        .repos
        .iter()
        .map(|arg| RepoRef::parse(arg))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(path) = &args.repos_file {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        repos.extend(parse_repo_list(&content));
    }

    let repos = dedupe(repos);
    if repos.is_empty() {
        return Err("No repositories given. Pass owner/name arguments or --repos-file.".into());
    }
    Ok(repos)
}

/// Crawl options from CLI flags over config defaults.
fn crawl_options(args: &CrawlArgs, config: &Config, shutdown: Arc<AtomicBool>) -> CrawlOptions {
    let failed_actor_policy = if args.hold_failed_pages || config.crawl.hold_failed_pages {
        FailedActorPolicy::HoldCheckpoint
    } else {
        FailedActorPolicy::Skip
    };

    CrawlOptions {
        batch_width: args.concurrency.unwrap_or(config.crawl.concurrency).max(1),
        page_size: args.page_size.unwrap_or(config.crawl.page_size).clamp(1, 100),
        event_pages: args.event_pages.unwrap_or(config.crawl.event_pages),
        failed_actor_policy,
        kinds: if args.only.is_empty() {
            InteractionKind::ALL.to_vec()
        } else {
            args.only.clone()
        },
        shutdown: Some(shutdown),
    }
}

/// Retry ceiling and optional pacing for every source call.
fn build_gateway(args: &CrawlArgs, config: &Config) -> Gateway {
    let max_attempts = args.max_attempts.unwrap_or(config.crawl.max_attempts).max(1);
    let gateway = Gateway::new(RetryPolicy::default().with_max_attempts(max_attempts));

    if args.no_rate_limit || config.crawl.no_rate_limit {
        gateway
    } else {
        gateway.with_limiter(ApiRateLimiter::new(config.crawl.requests_per_second))
    }
}

pub(crate) async fn handle_crawl(
    args: CrawlArgs,
    config: &Config,
    database_url: &str,
    shutdown: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let repos = collect_repos(&args)?;
    let options = crawl_options(&args, config, shutdown);
    let timeout = Duration::from_secs(config.crawl.request_timeout_secs);

    let token = config.github_token();
    if token.is_none() {
        tracing::warn!("No GitHub token configured; unauthenticated requests are heavily rate limited");
    }

    let mut github = GitHubClient::with_reqwest(token, timeout)?;
    if let Some(api_base) = &config.github.api_base {
        github = github.with_api_base(api_base.clone());
    }

    let db = connect_and_migrate(database_url).await?;
    let reporter = Arc::new(ProgressReporter::new());

    let mut builder = CrawlContext::builder()
        .client(Arc::new(github))
        .database(Arc::new(db))
        .gateway(build_gateway(&args, config))
        .options(options)
        .progress(reporter.as_callback());

    if config.crawl.social && !args.no_social {
        let transport = ReqwestTransport::with_timeout(timeout)?;
        builder = builder.social(SocialProfileFetcher::new(Arc::new(transport)));
    }

    let ctx = builder.build()?;
    let reports = sync_repositories(&ctx, &repos).await;
    reporter.finish();

    print_summary(&reports);

    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    if failed > 0 {
        return Err(format!("{failed} of {} repositories failed", reports.len()).into());
    }
    Ok(())
}

fn print_summary(reports: &[RepositoryReport]) {
    let rows: Vec<KindSummary> = reports
        .iter()
        .flat_map(|report| {
            report
                .kinds
                .iter()
                .map(move |kind| KindSummary::from_report(report, kind))
        })
        .collect();

    if !rows.is_empty() {
        let mut table = tabled::Table::new(rows);
        table.with(tabled::settings::Style::rounded());
        println!("{table}");
    }

    let is_tty = Term::stdout().is_term();
    for report in reports {
        if let Some(error) = &report.error {
            if is_tty {
                println!("{} {}: {error}", style("✗").red().bold(), report.repo);
            } else {
                println!("FAILED {}: {error}", report.repo);
            }
        }
    }
}
