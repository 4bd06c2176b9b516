//! Commit-authorship email discovery from public event history.

use crate::gateway::{Gateway, Retried};
use crate::source::{PublicEvent, SourceClient};

/// Suffix of GitHub's privacy-preserving placeholder addresses.
pub const PLACEHOLDER_SUFFIX: &str = "@users.noreply.github.com";

/// Substrings that mark automation-authored commits.
const BOT_MARKERS: [&str; 2] = ["[bot]", "github-actions"];

/// Events per page when scanning history.
pub const EVENTS_PER_PAGE: u32 = 100;

const PUSH_EVENT: &str = "PushEvent";

pub fn is_bot_email(email: &str) -> bool {
    BOT_MARKERS.iter().any(|marker| email.contains(marker))
}

pub fn is_placeholder_email(email: &str) -> bool {
    email.to_ascii_lowercase().ends_with(PLACEHOLDER_SUFFIX)
}

/// Incremental email selection over pages of events, newest first.
///
/// The first real address seen wins outright. Placeholder addresses are
/// kept as a fallback, preferring the most recent one.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EmailScan {
    found: Option<String>,
    placeholder: Option<String>,
}

impl EmailScan {
    /// Feed one page. Returns `true` once a real address has been found.
    pub fn observe(&mut self, events: &[PublicEvent]) -> bool {
        if self.found.is_some() {
            return true;
        }

        let emails = events
            .iter()
            .filter(|event| event.event_type == PUSH_EVENT)
            .flat_map(|event| event.commit_emails.iter())
            .map(|email| email.trim())
            .filter(|email| !email.is_empty() && !is_bot_email(email));

        for email in emails {
            if is_placeholder_email(email) {
                if self.placeholder.is_none() {
                    self.placeholder = Some(email.to_string());
                }
            } else {
                self.found = Some(email.to_string());
                return true;
            }
        }

        false
    }

    pub fn is_done(&self) -> bool {
        self.found.is_some()
    }

    /// The chosen address, if any.
    pub fn finish(self) -> Option<String> {
        self.found.or(self.placeholder)
    }
}

/// Scan up to `max_pages` pages of `login`'s public events.
///
/// Never fails: a missing history, a soft failure, or any other error
/// ends the scan and keeps whatever was found so far.
pub async fn scan_commit_email(
    client: &dyn SourceClient,
    gateway: &Gateway,
    login: &str,
    max_pages: u32,
) -> Option<String> {
    let mut scan = EmailScan::default();

    for page in 1..=max_pages {
        let label = format!("events {login} p{page}");
        let events = match gateway
            .execute(&label, || client.user_events(login, page, EVENTS_PER_PAGE))
            .await
        {
            Ok(Retried::Done(events)) => events,
            Ok(Retried::GaveUp(failure)) => {
                tracing::debug!(login, %failure, "Event scan gave up");
                break;
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(login, "No public event history");
                break;
            }
            Err(e) => {
                tracing::debug!(login, error = %e, "Event scan failed");
                break;
            }
        };

        if events.is_empty() || scan.observe(&events) {
            break;
        }
    }

    scan.finish()
}
