//! Best-effort secondary social profile lookup.
//!
//! The profile page is fetched unauthenticated and only its embedded
//! OpenGraph metadata is read. Every failed fetch collapses to an empty
//! [`SocialProfile`]; a successful one always carries the profile URL.

use std::sync::Arc;
use std::time::Duration;

use scraper::{Html, Selector};

use crate::http::{HttpRequest, HttpTransport};

pub const DEFAULT_SOCIAL_BASE: &str = "https://x.com";

/// Timeout for the whole social profile request.
pub const SOCIAL_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; cohort/0.1; +https://github.com/cohort-rs/cohort)";

const SITE_NAME_MARKER: &str = "X (formerly Twitter)";

/// Fields read from a social profile page. All `None` on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialProfile {
    pub url: Option<String>,
    pub bio: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
}

#[derive(Clone)]
pub struct SocialProfileFetcher {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    timeout: Duration,
}

impl SocialProfileFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_SOCIAL_BASE.to_string(),
            timeout: SOCIAL_FETCH_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch and parse the profile of `handle`.
    pub async fn fetch(&self, handle: &str) -> SocialProfile {
        let Some(handle) = normalize_handle(handle) else {
            return SocialProfile::default();
        };

        let url = format!("{}/{}", self.base_url, handle);
        let request = HttpRequest::get(url.clone())
            .header("User-Agent", BROWSER_USER_AGENT)
            .header("Accept", "text/html");

        let response = match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
            Ok(Ok(response)) if response.is_success() => response,
            Ok(Ok(response)) => {
                tracing::debug!(handle, status = response.status, "Social profile unavailable");
                return SocialProfile::default();
            }
            Ok(Err(e)) => {
                tracing::debug!(handle, error = %e, "Social profile fetch failed");
                return SocialProfile::default();
            }
            Err(_) => {
                tracing::debug!(handle, timeout_s = self.timeout.as_secs(), "Social profile fetch timed out");
                return SocialProfile::default();
            }
        };

        // A reachable page records the URL even when it carries no metadata.
        let mut profile = parse_profile_page(&response.text()).unwrap_or_default();
        profile.url = Some(format!("{DEFAULT_SOCIAL_BASE}/{handle}"));
        profile
    }
}

impl std::fmt::Debug for SocialProfileFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocialProfileFetcher")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Strip a leading `@` and reject anything that is not a bare handle.
fn normalize_handle(handle: &str) -> Option<&str> {
    let handle = handle.trim().trim_start_matches('@');
    let valid = !handle.is_empty()
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(handle)
}

fn meta_content(document: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!("meta[property=\"{property}\"]")).ok()?;
    document
        .select(&selector)
        .find_map(|element| element.value().attr("content"))
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}

/// Parse OpenGraph bio and name, and the location node when the page is an
/// X profile. `None` when the page carries none of them.
pub fn parse_profile_page(body: &str) -> Option<SocialProfile> {
    let document = Html::parse_document(body);

    let bio = meta_content(&document, "og:description");
    let name = meta_content(&document, "og:title");
    let location = meta_content(&document, "og:site_name")
        .filter(|site| site.contains(SITE_NAME_MARKER))
        .and_then(|_| {
            let selector = Selector::parse("[data-testid=\"UserLocation\"]").ok()?;
            let text: String = document.select(&selector).next()?.text().collect();
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        });

    if bio.is_none() && name.is_none() && location.is_none() {
        return None;
    }

    Some(SocialProfile {
        url: None,
        bio,
        name,
        location,
    })
}
