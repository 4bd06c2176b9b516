//! GitHub implementation of [`SourceClient`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::classify::classify;
use super::graphql::{self, ConnectionData, TOTALS_QUERY, TotalsData};
use super::types::RawEvent;
use crate::entity::interaction_kind::InteractionKind;
use crate::gateway::Outcome;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};
use crate::source::{
    ActorProfile, ConnectionPage, Contributor, PublicEvent, RepoRef, RepositoryTotals,
    SourceClient, SourceError,
};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("cohort/", env!("CARGO_PKG_VERSION"));

/// REST + GraphQL client for `api.github.com`.
///
/// Every response is classified before it is returned; retrying is the
/// caller's job.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    token: Option<String>,
    api_base: String,
}

impl GitHubClient {
    pub fn new(transport: Arc<dyn HttpTransport>, token: Option<String>) -> Self {
        Self {
            transport,
            token: token.filter(|t| !t.trim().is_empty()),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// A client over a reqwest transport with the given request timeout.
    pub fn with_reqwest(token: Option<String>, timeout: Duration) -> Result<Self, HttpError> {
        let transport = ReqwestTransport::with_timeout(timeout)?;
        Ok(Self::new(Arc::new(transport), token))
    }

    /// Point the client at another API root (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn graphql_url(&self) -> String {
        format!("{}/graphql", self.api_base)
    }

    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        let request = request
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn send_raw(&self, request: HttpRequest) -> Result<HttpResponse, SourceError> {
        let request = self.authorize(request);
        tracing::trace!(method = request.method.as_str(), url = %request.url, "GitHub request");
        Ok(self.transport.send(request).await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String, resource: &str) -> Outcome<T> {
        match self.send_raw(HttpRequest::get(url)).await {
            Ok(response) => classify(response, resource).and_then(|response| {
                serde_json::from_slice(&response.body).map_err(SourceError::from)
            }),
            Err(e) => Outcome::Other(e),
        }
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
        resource: &str,
    ) -> Outcome<T> {
        let request = HttpRequest::post_json(self.graphql_url(), graphql::request_body(query, variables));
        match self.send_raw(request).await {
            Ok(response) => {
                classify(response, resource).then(|response| graphql::decode(&response, resource))
            }
            Err(e) => Outcome::Other(e),
        }
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_base", &self.api_base)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

#[async_trait]
impl SourceClient for GitHubClient {
    async fn connection_page(
        &self,
        repo: &RepoRef,
        kind: InteractionKind,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Outcome<ConnectionPage> {
        let resource = format!("{repo} {kind}");
        let Some(query) = graphql::connection_query(kind) else {
            return Outcome::Other(SourceError::Api {
                status: 0,
                message: format!("{kind} is not cursor-paginated"),
            });
        };

        let variables = json!({
            "owner": repo.owner,
            "repo": repo.name,
            "cursor": cursor,
            "first": page_size.clamp(1, 100),
        });

        self.graphql::<ConnectionData>(&query, variables, &resource)
            .await
            .and_then(|data| data.into_page(&resource))
    }

    async fn contributors_page(
        &self,
        repo: &RepoRef,
        page: u32,
        per_page: u32,
    ) -> Outcome<Vec<Contributor>> {
        let url = format!(
            "{}/repos/{}/{}/contributors?per_page={}&page={}&anon=false",
            self.api_base,
            repo.owner,
            repo.name,
            per_page.clamp(1, 100),
            page
        );
        let resource = format!("{repo} contributors");

        match self.send_raw(HttpRequest::get(url)).await {
            // Empty repositories answer 204 with no body.
            Ok(response) if response.status == 204 => Outcome::Ok(Vec::new()),
            Ok(response) => classify(response, &resource).and_then(|response| {
                serde_json::from_slice(&response.body).map_err(SourceError::from)
            }),
            Err(e) => Outcome::Other(e),
        }
    }

    async fn repository_totals(&self, repo: &RepoRef) -> Outcome<RepositoryTotals> {
        let resource = format!("{repo} totals");
        let variables = json!({ "owner": repo.owner, "repo": repo.name });
        self.graphql::<TotalsData>(TOTALS_QUERY, variables, &resource)
            .await
            .and_then(|data| data.into_totals(&resource))
    }

    async fn user_profile(&self, login: &str) -> Outcome<ActorProfile> {
        let url = format!("{}/users/{}", self.api_base, login);
        self.get_json(url, &format!("user {login}")).await
    }

    async fn user_events(
        &self,
        login: &str,
        page: u32,
        per_page: u32,
    ) -> Outcome<Vec<PublicEvent>> {
        let url = format!(
            "{}/users/{}/events/public?per_page={}&page={}",
            self.api_base,
            login,
            per_page.clamp(1, 100),
            page
        );
        let resource = format!("events {login}");

        match self.send_raw(HttpRequest::get(url)).await {
            // Paging past the event window answers 422.
            Ok(response) if response.status == 422 => Outcome::Ok(Vec::new()),
            Ok(response) => classify(response, &resource)
                .and_then(|response| {
                    serde_json::from_slice::<Vec<RawEvent>>(&response.body)
                        .map_err(SourceError::from)
                })
                .map(|events| events.into_iter().map(PublicEvent::from).collect()),
            Err(e) => Outcome::Other(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, MockTransport};

    const BASE: &str = "https://api.test";

    fn client(mock: &MockTransport, token: Option<&str>) -> GitHubClient {
        GitHubClient::new(Arc::new(mock.clone()), token.map(str::to_string)).with_api_base(BASE)
    }

    fn repo() -> RepoRef {
        RepoRef::new("rust-lang", "rust")
    }

    #[tokio::test]
    async fn connection_page_posts_graphql_with_auth_headers() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Post,
            format!("{BASE}/graphql"),
            200,
            json!({"data": {"repository": {"connection": {
                "pageInfo": {"hasNextPage": true, "endCursor": "c1"},
                "nodes": [{"login": "alice"}]
            }}}}),
        );

        let page = match client(&mock, Some("ghp_test"))
            .connection_page(&repo(), InteractionKind::Star, None, 100)
            .await
        {
            Outcome::Ok(page) => page,
            other => panic!("unexpected outcome: {}", other.tag()),
        };
        assert_eq!(page.logins, vec!["alice"]);
        assert_eq!(page.end_cursor.as_deref(), Some("c1"));

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(
            request
                .headers
                .iter()
                .any(|(k, v)| k == "Authorization" && v == "Bearer ghp_test")
        );
        let body: serde_json::Value = serde_json::from_slice(&request.body).expect("json body");
        assert_eq!(body["variables"]["owner"], "rust-lang");
        assert!(body["variables"]["cursor"].is_null());
        assert!(body["query"].as_str().expect("query").contains("stargazers"));
    }

    #[tokio::test]
    async fn anonymous_client_sends_no_authorization() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Get,
            format!("{BASE}/users/octocat"),
            200,
            json!({"login": "octocat", "html_url": "https://github.com/octocat", "followers": 10}),
        );

        let gh = client(&mock, Some("  "));
        assert!(!gh.is_authenticated());
        let Outcome::Ok(profile) = gh.user_profile("octocat").await else {
            panic!("expected profile");
        };
        assert_eq!(profile.profile_url.as_deref(), Some("https://github.com/octocat"));
        assert_eq!(profile.followers, Some(10));
        assert!(
            !mock.requests()[0]
                .headers
                .iter()
                .any(|(k, _)| k == "Authorization")
        );
    }

    #[tokio::test]
    async fn rate_limited_rest_call_is_classified() {
        let mock = MockTransport::new();
        mock.push_response(
            HttpMethod::Get,
            format!("{BASE}/users/octocat"),
            HttpResponse {
                status: 403,
                headers: vec![
                    ("x-ratelimit-remaining".into(), "0".into()),
                    ("x-ratelimit-reset".into(), "1700000000".into()),
                ],
                body: b"{\"message\":\"API rate limit exceeded\"}".to_vec(),
            },
        );

        let outcome = client(&mock, None).user_profile("octocat").await;
        assert!(matches!(outcome, Outcome::RateLimited { .. }));
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Get,
            format!("{BASE}/users/ghost"),
            404,
            json!({"message": "Not Found"}),
        );

        match client(&mock, None).user_profile("ghost").await {
            Outcome::Other(e) => assert!(e.is_not_found()),
            other => panic!("unexpected outcome: {}", other.tag()),
        }
    }

    #[tokio::test]
    async fn contributors_page_handles_empty_repository() {
        let mock = MockTransport::new();
        let url = format!("{BASE}/repos/rust-lang/rust/contributors?per_page=100&page=1&anon=false");
        mock.push_response(
            HttpMethod::Get,
            url,
            HttpResponse {
                status: 204,
                headers: Vec::new(),
                body: Vec::new(),
            },
        );

        let outcome = client(&mock, None).contributors_page(&repo(), 1, 100).await;
        assert!(matches!(outcome, Outcome::Ok(ref v) if v.is_empty()));
    }

    #[tokio::test]
    async fn contributors_page_decodes_entries() {
        let mock = MockTransport::new();
        let url = format!("{BASE}/repos/rust-lang/rust/contributors?per_page=50&page=2&anon=false");
        mock.push_json(
            HttpMethod::Get,
            url,
            200,
            json!([
                {"login": "alice", "type": "User", "contributions": 42},
                {"login": "bors", "type": "Bot", "contributions": 9000}
            ]),
        );

        let Outcome::Ok(page) = client(&mock, None).contributors_page(&repo(), 2, 50).await else {
            panic!("expected contributors");
        };
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].user_login(), Some("alice"));
        assert_eq!(page[0].contributions, 42);
        assert_eq!(page[1].user_login(), None);
    }

    #[tokio::test]
    async fn events_past_window_are_empty() {
        let mock = MockTransport::new();
        let url = format!("{BASE}/users/octocat/events/public?per_page=100&page=4");
        mock.push_json(
            HttpMethod::Get,
            url,
            422,
            json!({"message": "In order to keep the API fast for everyone, pagination is limited"}),
        );

        let outcome = client(&mock, None).user_events("octocat", 4, 100).await;
        assert!(matches!(outcome, Outcome::Ok(ref v) if v.is_empty()));
    }

    #[tokio::test]
    async fn server_error_on_totals_is_transient() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Post,
            format!("{BASE}/graphql"),
            502,
            json!({"message": "Bad Gateway"}),
        );

        let outcome = client(&mock, None).repository_totals(&repo()).await;
        assert!(matches!(outcome, Outcome::ServerError { status: 502 }));
    }

    #[tokio::test]
    async fn transport_failure_is_a_network_error() {
        let mock = MockTransport::new();
        let outcome = client(&mock, None).user_profile("octocat").await;
        assert!(matches!(
            outcome,
            Outcome::Other(SourceError::Network { .. })
        ));
    }

    #[tokio::test]
    async fn contribute_has_no_connection_query() {
        let mock = MockTransport::new();
        let outcome = client(&mock, None)
            .connection_page(&repo(), InteractionKind::Contribute, None, 100)
            .await;
        assert!(matches!(outcome, Outcome::Other(SourceError::Api { .. })));
        assert!(mock.requests().is_empty());
    }
}
