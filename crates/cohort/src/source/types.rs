//! Domain types returned by the primary source.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::entity::interaction_kind::InteractionKind;

/// A repository addressed by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name`, `github.com/owner/name`, or a full repository URL.
    ///
    /// The first two path segments name the repository, so links into a
    /// repository (`/tree/main`, `/pull/1`) resolve to the repository itself.
    /// A trailing `.git` is dropped.
    pub fn parse(input: &str) -> Result<Self, RepoRefError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RepoRefError::new(input));
        }

        let segments: Vec<String> = if trimmed.contains("://") {
            let url = Url::parse(trimmed).map_err(|_| RepoRefError::new(input))?;
            url.path_segments()
                .map(|segments| {
                    segments
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        } else {
            let path = trimmed
                .strip_prefix("github.com/")
                .or_else(|| trimmed.strip_prefix("www.github.com/"))
                .unwrap_or(trimmed);
            path.split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };

        if segments.len() < 2 {
            return Err(RepoRefError::new(input));
        }

        let owner = &segments[0];
        let raw_name = &segments[1];
        let name = raw_name.strip_suffix(".git").unwrap_or(raw_name);
        if owner.is_empty() || name.is_empty() {
            return Err(RepoRefError::new(input));
        }

        Ok(Self::new(owner.clone(), name))
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = RepoRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a repository reference: {input:?}")]
pub struct RepoRefError {
    pub input: String,
}

impl RepoRefError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}

/// One page of a cursor-paginated connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionPage {
    /// Actor handles on this page, in source order.
    pub logins: Vec<String>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// One entry of the contributor listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Contributor {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub contributions: u32,
}

impl Contributor {
    /// Login of a human account, or `None` for bots, organizations, and
    /// anonymous entries.
    #[must_use]
    pub fn user_login(&self) -> Option<&str> {
        match (self.account_type.as_deref(), self.login.as_deref()) {
            (Some("User"), Some(login)) if !login.is_empty() => Some(login),
            _ => None,
        }
    }
}

/// Authoritative per-kind totals for a repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryTotals {
    pub stargazers: u64,
    pub watchers: u64,
    pub forks: u64,
}

impl RepositoryTotals {
    /// Total for a cursor-paginated kind. Contributors have no aggregate.
    #[must_use]
    pub fn get(&self, kind: InteractionKind) -> Option<u64> {
        match kind {
            InteractionKind::Star => Some(self.stargazers),
            InteractionKind::Watch => Some(self.watchers),
            InteractionKind::Fork => Some(self.forks),
            InteractionKind::Contribute => None,
        }
    }
}

/// Primary profile fields for an actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActorProfile {
    pub login: String,
    #[serde(rename = "html_url", default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub followers: Option<i64>,
    #[serde(default)]
    pub following: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub blog: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub twitter_username: Option<String>,
    #[serde(default)]
    pub public_repos: Option<i64>,
}

/// A public event, reduced to the commit author emails it carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicEvent {
    pub event_type: String,
    pub commit_emails: Vec<String>,
}
