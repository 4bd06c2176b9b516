//! The kinds of relationship an actor can have with a repository.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Interaction between an actor and a repository.
///
/// Star, watch, and fork are walked with cursor pagination; contribute is
/// walked page by page and carries a weight (the contribution count).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    #[sea_orm(string_value = "star")]
    Star,
    #[sea_orm(string_value = "watch")]
    Watch,
    #[sea_orm(string_value = "fork")]
    Fork,
    #[sea_orm(string_value = "contribute")]
    Contribute,
}

impl InteractionKind {
    /// All kinds, in the order a repository is crawled.
    pub const ALL: [InteractionKind; 4] = [Self::Star, Self::Watch, Self::Fork, Self::Contribute];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Star => "star",
            Self::Watch => "watch",
            Self::Fork => "fork",
            Self::Contribute => "contribute",
        }
    }

    /// Plural noun for the actors of this kind, for log lines.
    #[must_use]
    pub fn actor_noun(self) -> &'static str {
        match self {
            Self::Star => "stargazers",
            Self::Watch => "watchers",
            Self::Fork => "forkers",
            Self::Contribute => "contributors",
        }
    }

    #[must_use]
    pub fn is_cursor_paginated(self) -> bool {
        !matches!(self, Self::Contribute)
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "star" | "stars" | "stargazer" | "stargazers" => Ok(Self::Star),
            "watch" | "watches" | "watcher" | "watchers" => Ok(Self::Watch),
            "fork" | "forks" | "forker" | "forkers" => Ok(Self::Fork),
            "contribute" | "contributor" | "contributors" => Ok(Self::Contribute),
            _ => Err(format!("Unknown interaction kind: {}", s)),
        }
    }
}
