//! Raw REST payloads that need reshaping before they leave this module.

use serde::Deserialize;

use crate::source::PublicEvent;

/// An entry of `GET /users/{login}/events/public`.
#[derive(Debug, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub payload: Option<RawPayload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawPayload {
    #[serde(default)]
    pub commits: Vec<RawCommit>,
}

#[derive(Debug, Deserialize)]
pub struct RawCommit {
    #[serde(default)]
    pub author: Option<RawCommitAuthor>,
}

#[derive(Debug, Deserialize)]
pub struct RawCommitAuthor {
    #[serde(default)]
    pub email: Option<String>,
}

impl From<RawEvent> for PublicEvent {
    fn from(raw: RawEvent) -> Self {
        let commit_emails = raw
            .payload
            .map(|payload| {
                payload
                    .commits
                    .into_iter()
                    .filter_map(|commit| commit.author.and_then(|a| a.email))
                    .filter(|email| !email.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        PublicEvent {
            event_type: raw.event_type,
            commit_emails,
        }
    }
}
