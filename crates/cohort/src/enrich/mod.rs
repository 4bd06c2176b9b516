//! Per-actor profile enrichment.
//!
//! For one handle: fetch the primary profile, fall back to commit emails
//! from public events when no public email is set, then read the secondary
//! social profile if the actor links one. Only a failure of the primary
//! profile fetch fails the actor; later steps degrade to `None` fields.

pub mod email;
pub mod social;

use std::sync::Arc;

use thiserror::Error;

use crate::gateway::{Gateway, Retried, SoftFailure};
use crate::record::ActorRecord;
use crate::source::{SourceClient, SourceError};

pub use email::{EmailScan, is_bot_email, is_placeholder_email, scan_commit_email};
pub use social::{SocialProfile, SocialProfileFetcher};

/// Default number of event pages scanned per actor.
pub const DEFAULT_EVENT_PAGES: u32 = 3;

/// Why an actor could not be enriched.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    GaveUp(#[from] SoftFailure),
}

/// Composes the lookups for one actor.
#[derive(Clone)]
pub struct Enricher {
    client: Arc<dyn SourceClient>,
    gateway: Arc<Gateway>,
    social: Option<SocialProfileFetcher>,
    event_pages: u32,
}

impl Enricher {
    pub fn new(client: Arc<dyn SourceClient>, gateway: Arc<Gateway>) -> Self {
        Self {
            client,
            gateway,
            social: None,
            event_pages: DEFAULT_EVENT_PAGES,
        }
    }

    #[must_use]
    pub fn with_social(mut self, social: SocialProfileFetcher) -> Self {
        self.social = Some(social);
        self
    }

    #[must_use]
    pub fn with_event_pages(mut self, event_pages: u32) -> Self {
        self.event_pages = event_pages;
        self
    }

    /// Build the merged record for `login`.
    ///
    /// A missing or suspended account yields a handle-only record.
    pub async fn enrich(&self, login: &str) -> Result<ActorRecord, EnrichError> {
        let label = format!("user {login}");
        let mut record = match self
            .gateway
            .execute(&label, || self.client.user_profile(login))
            .await
        {
            Ok(Retried::Done(profile)) => ActorRecord::from_profile(profile),
            Ok(Retried::GaveUp(failure)) => return Err(failure.into()),
            Err(e) if e.is_not_found() => {
                tracing::warn!(login, "Profile not found, keeping handle only");
                ActorRecord::handle_only(login)
            }
            Err(e) => return Err(e.into()),
        };

        // The crawled handle is the store key.
        record.login = login.to_string();

        if record.email.is_none() && self.event_pages > 0 {
            record.email =
                scan_commit_email(self.client.as_ref(), &self.gateway, login, self.event_pages)
                    .await;
        }

        if let (Some(social), Some(handle)) = (&self.social, record.twitter_username.as_deref()) {
            let profile = social.fetch(handle).await;
            record.social_url = profile.url;
            record.social_bio = profile.bio;
            record.social_name = profile.name;
            record.social_location = profile.location;
        }

        Ok(record)
    }
}

impl std::fmt::Debug for Enricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enricher")
            .field("gateway", &self.gateway)
            .field("social", &self.social)
            .field("event_pages", &self.event_pages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::clock::ManualClock;
    use crate::gateway::{Outcome, RetryPolicy};
    use crate::http::{HttpMethod, HttpResponse, MockTransport};
    use crate::source::ActorProfile;
    use crate::source::fake::{FakeSource, push_event};

    fn gateway() -> Arc<Gateway> {
        let clock = ManualClock::starting_at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        Arc::new(Gateway::new(RetryPolicy::default()).with_clock(Arc::new(clock)))
    }

    #[tokio::test]
    async fn public_email_skips_event_scan() {
        let source = Arc::new(FakeSource::new());
        source.put_profile(ActorProfile {
            login: "alice".into(),
            email: Some("alice@example.com".into()),
            ..ActorProfile::default()
        });

        let record = Enricher::new(source.clone(), gateway())
            .enrich("alice")
            .await
            .expect("enriched");
        assert_eq!(record.email.as_deref(), Some("alice@example.com"));
        assert_eq!(source.calls(), vec!["profile alice"]);
    }

    #[tokio::test]
    async fn event_scan_stops_at_first_real_email() {
        let source = Arc::new(FakeSource::new());
        source.add_profile("bob");
        source.set_events(
            "bob",
            vec![
                vec![push_event(&["9+bob@users.noreply.github.com"])],
                vec![push_event(&["bob@example.org"])],
                vec![push_event(&["never@example.org"])],
            ],
        );

        let record = Enricher::new(source.clone(), gateway())
            .enrich("bob")
            .await
            .expect("enriched");
        assert_eq!(record.email.as_deref(), Some("bob@example.org"));
        assert!(!source.calls().contains(&"events bob p3".to_string()));
    }

    #[tokio::test]
    async fn missing_event_history_leaves_email_empty() {
        let source = Arc::new(FakeSource::new());
        source.add_profile("carol");

        let record = Enricher::new(source, gateway())
            .enrich("carol")
            .await
            .expect("enriched");
        assert_eq!(record.email, None);
        assert_eq!(record.profile_url.as_deref(), Some("https://github.com/carol"));
    }

    #[tokio::test]
    async fn missing_profile_yields_handle_only() {
        let source = Arc::new(FakeSource::new());
        let record = Enricher::new(source, gateway())
            .with_event_pages(0)
            .enrich("ghost")
            .await
            .expect("handle only");
        assert_eq!(record, ActorRecord::handle_only("ghost"));
    }

    #[tokio::test]
    async fn profile_errors_fail_the_actor() {
        let source = Arc::new(FakeSource::new());
        source.script_profile(
            "dave",
            Outcome::Other(SourceError::Forbidden {
                message: "blocked".into(),
            }),
        );
        let err = Enricher::new(source, gateway())
            .enrich("dave")
            .await
            .expect_err("forbidden");
        assert!(matches!(err, EnrichError::Source(SourceError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn perpetual_server_errors_give_up() {
        let source = Arc::new(FakeSource::new());
        for _ in 0..5 {
            source.script_profile("erin", Outcome::ServerError { status: 503 });
        }
        let err = Enricher::new(source, gateway())
            .enrich("erin")
            .await
            .expect_err("gave up");
        assert!(matches!(err, EnrichError::GaveUp(SoftFailure { attempts: 5, .. })));
    }

    #[tokio::test]
    async fn social_profile_fields_are_merged() {
        let source = Arc::new(FakeSource::new());
        source.put_profile(ActorProfile {
            login: "frank".into(),
            email: Some("frank@example.com".into()),
            twitter_username: Some("frank_rs".into()),
            ..ActorProfile::default()
        });

        let mock = MockTransport::new();
        mock.push_response(
            HttpMethod::Get,
            "https://social.test/frank_rs",
            HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: br#"<meta property="og:title" content="Frank">
                    <meta property="og:description" content="Systems person">"#
                    .to_vec(),
            },
        );
        let social =
            SocialProfileFetcher::new(Arc::new(mock)).with_base_url("https://social.test");

        let record = Enricher::new(source, gateway())
            .with_social(social)
            .enrich("frank")
            .await
            .expect("enriched");
        assert_eq!(record.social_url.as_deref(), Some("https://x.com/frank_rs"));
        assert_eq!(record.social_name.as_deref(), Some("Frank"));
        assert_eq!(record.social_bio.as_deref(), Some("Systems person"));
        assert_eq!(record.social_location, None);
    }
}
