use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use cohort::{CrawlProgress, InteractionKind};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Mutable progress state, kept under a single lock.
#[derive(Default)]
struct ProgressState {
    /// Repositories processed in this run.
    run_bar: Option<ProgressBar>,
    /// Counter bars for crawls in flight.
    crawl_bars: HashMap<(String, InteractionKind), ProgressBar>,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    #[cfg(test)]
    pub(crate) fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()),
            state: Mutex::new(ProgressState::default()),
        }
    }

    #[cfg(test)]
    pub(crate) fn live_crawls(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .crawl_bars
            .len()
    }

    pub fn handle(&self, event: CrawlProgress) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        match event {
            CrawlProgress::RepositoryStarted { repo, index, total } => {
                let bar = state.run_bar.get_or_insert_with(|| {
                    let bar = self.multi.add(ProgressBar::new(total as u64));
                    bar.set_style(Self::bar_style());
                    bar.set_prefix(format!("{:24}", "repositories"));
                    bar
                });
                bar.set_length(total as u64);
                bar.set_position(index.saturating_sub(1) as u64);
                bar.set_message(repo);
            }

            CrawlProgress::CrawlStarted {
                repo,
                kind,
                resume_from,
            } => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(Self::counter_style());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar.set_prefix(format!("{:24}", format!("{repo} {kind}")));
                bar.set_message(match resume_from {
                    Some(position) => format!("resuming from {position}"),
                    None => kind.actor_noun().to_string(),
                });
                state.crawl_bars.insert((repo, kind), bar);
            }

            CrawlProgress::PageFetched {
                repo,
                kind,
                page,
                actors,
            } => {
                if let Some(bar) = state.crawl_bars.get(&(repo, kind)) {
                    bar.set_message(format!(
                        "{} (page {page}, {actors} on page)",
                        kind.actor_noun()
                    ));
                }
            }

            CrawlProgress::ActorSynced { repo, kind, .. } => {
                if let Some(bar) = state.crawl_bars.get(&(repo, kind)) {
                    bar.inc(1);
                }
            }

            CrawlProgress::ActorFailed {
                repo,
                kind,
                login,
                error,
            } => {
                if let Some(bar) = state.crawl_bars.get(&(repo, kind)) {
                    bar.inc(1);
                }
                let _ = self.multi.println(format!(
                    "{} {login}: {error}",
                    style("failed").yellow()
                ));
            }

            CrawlProgress::CrawlFinished {
                repo,
                kind,
                status,
                pages,
                actors,
            } => {
                if let Some(bar) = state.crawl_bars.remove(&(repo, kind)) {
                    bar.set_style(Self::done_style());
                    bar.finish_with_message(format!(
                        "{status}: {actors} {} over {pages} pages",
                        kind.actor_noun()
                    ));
                }
            }

            CrawlProgress::ReconcileMismatch {
                repo,
                kind,
                persisted,
                authoritative,
            } => {
                let _ = self.multi.println(format!(
                    "{} {repo} {kind}: {persisted} stored, {authoritative} reported; re-crawling",
                    style("mismatch").yellow()
                ));
            }

            CrawlProgress::Backoff {
                label,
                delay_ms,
                reason,
                ..
            } => {
                let _ = self.multi.println(format!(
                    "{} {label}: {reason}, waiting {}s",
                    style("backoff").dim(),
                    delay_ms.div_ceil(1_000)
                ));
            }

            CrawlProgress::GaveUp { label, attempts } => {
                let _ = self.multi.println(format!(
                    "{} {label} after {attempts} attempts",
                    style("gave up").red()
                ));
            }

            CrawlProgress::RepositoryFinished { .. } => {
                if let Some(bar) = &state.run_bar {
                    bar.inc(1);
                }
            }

            CrawlProgress::RepositoryFailed { repo, error } => {
                if let Some(bar) = &state.run_bar {
                    bar.inc(1);
                }
                let _ = self
                    .multi
                    .println(format!("{} {repo}: {error}", style("error").red().bold()));
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, bar) in state.crawl_bars.drain() {
            bar.abandon();
        }
        if let Some(bar) = state.run_bar.take() {
            bar.finish_with_message("done");
        }
    }

    fn counter_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {pos:>6} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn done_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {pos:>8} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
