//! The merged actor record and the edge that tags it to a repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::interaction_kind::InteractionKind;
use crate::source::{ActorProfile, RepoRef};

/// Everything known about an actor after enrichment.
///
/// All fields except the handle are nullable; enrichment failures leave
/// them `None` rather than failing the actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub login: String,

    // ─── Primary profile ────────────────────────────────────────────────
    pub profile_url: Option<String>,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub twitter_username: Option<String>,
    pub followers: Option<i64>,
    pub following: Option<i64>,
    pub public_repos: Option<i64>,
    pub account_created_at: Option<DateTime<Utc>>,

    // ─── Secondary social profile ───────────────────────────────────────
    pub social_url: Option<String>,
    pub social_bio: Option<String>,
    pub social_name: Option<String>,
    pub social_location: Option<String>,
}

impl ActorRecord {
    /// A record carrying only the handle.
    pub fn handle_only(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            ..Self::default()
        }
    }

    /// Seed a record from primary profile fields. Empty strings become `None`.
    pub fn from_profile(profile: ActorProfile) -> Self {
        Self {
            login: profile.login,
            profile_url: non_empty(profile.profile_url),
            name: non_empty(profile.name),
            bio: non_empty(profile.bio),
            company: non_empty(profile.company),
            blog: non_empty(profile.blog),
            location: non_empty(profile.location),
            email: non_empty(profile.email),
            twitter_username: non_empty(profile.twitter_username),
            followers: profile.followers,
            following: profile.following,
            public_repos: profile.public_repos,
            account_created_at: profile.created_at,
            ..Self::default()
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// A typed relationship between an actor and a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub kind: InteractionKind,
    pub repository_owner: String,
    pub repository_name: String,
    /// Contribution count for `contribute` edges.
    pub weight: Option<i64>,
}

impl Edge {
    pub fn new(kind: InteractionKind, repo: &RepoRef) -> Self {
        Self {
            kind,
            repository_owner: repo.owner.clone(),
            repository_name: repo.name.clone(),
            weight: None,
        }
    }

    pub fn contribution(repo: &RepoRef, contributions: u32) -> Self {
        Self {
            weight: Some(i64::from(contributions)),
            ..Self::new(InteractionKind::Contribute, repo)
        }
    }

    /// Deduplication key: two edges with the same key are the same edge,
    /// whatever their weight.
    #[must_use]
    pub fn key(&self) -> (InteractionKind, &str, &str) {
        (
            self.kind,
            self.repository_owner.as_str(),
            self.repository_name.as_str(),
        )
    }
}

/// An actor together with all of its edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorDocument {
    #[serde(flatten)]
    pub record: ActorRecord,
    pub interactions: Vec<Edge>,
}
