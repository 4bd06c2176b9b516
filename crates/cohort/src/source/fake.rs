//! Scripted in-memory source for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    ActorProfile, ConnectionPage, Contributor, PublicEvent, RepoRef, RepositoryTotals,
    SourceClient, SourceError,
};
use crate::entity::interaction_kind::InteractionKind;
use crate::gateway::Outcome;

/// Cursors are `c{n}` where `n` is the number of pages served before.
#[derive(Default)]
pub struct FakeSource {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    connections: HashMap<InteractionKind, Vec<Vec<String>>>,
    contributors: Vec<Vec<Contributor>>,
    totals: RepositoryTotals,
    profiles: HashMap<String, ActorProfile>,
    scripted_profiles: HashMap<String, VecDeque<Outcome<ActorProfile>>>,
    events: HashMap<String, Vec<Vec<PublicEvent>>>,
    connection_failures: HashMap<InteractionKind, u32>,
    missing_repos: HashSet<String>,
    calls: Vec<String>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("fake source lock")
    }

    pub fn set_connection(&self, kind: InteractionKind, pages: Vec<Vec<&str>>) {
        let pages = pages
            .into_iter()
            .map(|page| page.into_iter().map(str::to_string).collect())
            .collect();
        self.state().connections.insert(kind, pages);
    }

    pub fn set_contributors(&self, pages: Vec<Vec<Contributor>>) {
        self.state().contributors = pages;
    }

    pub fn set_totals(&self, totals: RepositoryTotals) {
        self.state().totals = totals;
    }

    pub fn add_profile(&self, login: &str) {
        self.state().profiles.insert(
            login.to_string(),
            ActorProfile {
                login: login.to_string(),
                profile_url: Some(format!("https://github.com/{login}")),
                ..ActorProfile::default()
            },
        );
    }

    pub fn put_profile(&self, profile: ActorProfile) {
        self.state().profiles.insert(profile.login.clone(), profile);
    }

    /// Outcomes served before falling back to the stored profile.
    pub fn script_profile(&self, login: &str, outcome: Outcome<ActorProfile>) {
        self.state()
            .scripted_profiles
            .entry(login.to_string())
            .or_default()
            .push_back(outcome);
    }

    pub fn set_events(&self, login: &str, pages: Vec<Vec<PublicEvent>>) {
        self.state().events.insert(login.to_string(), pages);
    }

    /// Answer the next `n` connection requests of `kind` with a 503.
    pub fn fail_connection(&self, kind: InteractionKind, n: u32) {
        self.state().connection_failures.insert(kind, n);
    }

    /// Answer every listing of `repo` with not-found.
    pub fn remove_repo(&self, repo: &RepoRef) {
        self.state().missing_repos.insert(repo.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }
}

pub fn contributor(login: &str, account_type: &str, contributions: u32) -> Contributor {
    Contributor {
        login: Some(login.to_string()),
        account_type: Some(account_type.to_string()),
        contributions,
    }
}

pub fn push_event(emails: &[&str]) -> PublicEvent {
    PublicEvent {
        event_type: "PushEvent".to_string(),
        commit_emails: emails.iter().map(|e| e.to_string()).collect(),
    }
}

#[async_trait]
impl SourceClient for FakeSource {
    async fn connection_page(
        &self,
        repo: &RepoRef,
        kind: InteractionKind,
        cursor: Option<&str>,
        _page_size: u32,
    ) -> Outcome<ConnectionPage> {
        let mut state = self.state();
        state
            .calls
            .push(format!("{kind} after={}", cursor.unwrap_or("-")));

        if state.missing_repos.contains(&repo.to_string()) {
            return Outcome::Other(SourceError::not_found(repo.to_string()));
        }
        if let Some(remaining) = state.connection_failures.get_mut(&kind)
            && *remaining > 0
        {
            *remaining -= 1;
            return Outcome::ServerError { status: 503 };
        }

        let index = match cursor {
            None => 0,
            Some(cursor) => match cursor.strip_prefix('c').and_then(|n| n.parse::<usize>().ok()) {
                Some(n) => n,
                None => return Outcome::Other(SourceError::decode("bad cursor")),
            },
        };

        let pages = state.connections.get(&kind).cloned().unwrap_or_default();
        let logins = pages.get(index).cloned().unwrap_or_default();
        let end_cursor = (!logins.is_empty()).then(|| format!("c{}", index + 1));
        Outcome::Ok(ConnectionPage {
            logins,
            has_next_page: index + 1 < pages.len(),
            end_cursor,
        })
    }

    async fn contributors_page(
        &self,
        repo: &RepoRef,
        page: u32,
        _per_page: u32,
    ) -> Outcome<Vec<Contributor>> {
        let mut state = self.state();
        state.calls.push(format!("contributors p{page}"));
        if state.missing_repos.contains(&repo.to_string()) {
            return Outcome::Other(SourceError::not_found(repo.to_string()));
        }
        let index = (page as usize).saturating_sub(1);
        Outcome::Ok(state.contributors.get(index).cloned().unwrap_or_default())
    }

    async fn repository_totals(&self, _repo: &RepoRef) -> Outcome<RepositoryTotals> {
        let mut state = self.state();
        state.calls.push("totals".to_string());
        Outcome::Ok(state.totals)
    }

    async fn user_profile(&self, login: &str) -> Outcome<ActorProfile> {
        let mut state = self.state();
        state.calls.push(format!("profile {login}"));
        if let Some(outcome) = state
            .scripted_profiles
            .get_mut(login)
            .and_then(VecDeque::pop_front)
        {
            return outcome;
        }
        match state.profiles.get(login) {
            Some(profile) => Outcome::Ok(profile.clone()),
            None => Outcome::Other(SourceError::not_found(format!("user {login}"))),
        }
    }

    async fn user_events(
        &self,
        login: &str,
        page: u32,
        _per_page: u32,
    ) -> Outcome<Vec<PublicEvent>> {
        let mut state = self.state();
        state.calls.push(format!("events {login} p{page}"));
        match state.events.get(login) {
            Some(pages) => Outcome::Ok(
                pages
                    .get((page as usize).saturating_sub(1))
                    .cloned()
                    .unwrap_or_default(),
            ),
            None => Outcome::Other(SourceError::not_found(format!("events {login}"))),
        }
    }
}
