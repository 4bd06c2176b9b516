//! End-to-end crawl tests: the GitHub client over a scripted transport,
//! the full crawl engine, and an in-memory SQLite store.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use cohort::clock::ManualClock;
use cohort::http::{HttpError, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use cohort::store::{Position, actor, checkpoint};
use cohort::{
    CrawlContext, CrawlOptions, Gateway, GitHubClient, InteractionKind, RepoRef, RetryPolicy,
    connect_and_migrate, sync_repositories,
};
use serde_json::{Value, json};

const API: &str = "https://api.test";

/// Scripted GitHub API.
///
/// GraphQL connections are served from per-field page lists with cursors
/// `c{n}`. REST responses are queued per URL; the last one queued keeps
/// being served, and unknown URLs answer 404.
#[derive(Default)]
struct ScriptedApi {
    state: Mutex<ApiState>,
}

#[derive(Default)]
struct ApiState {
    connections: HashMap<&'static str, Vec<Vec<&'static str>>>,
    totals: (u64, u64, u64),
    rest: HashMap<String, VecDeque<HttpResponse>>,
    log: Vec<String>,
}

impl ScriptedApi {
    fn connection(&self, field: &'static str, pages: Vec<Vec<&'static str>>) {
        self.state.lock().unwrap().connections.insert(field, pages);
    }

    fn totals(&self, stars: u64, watchers: u64, forks: u64) {
        self.state.lock().unwrap().totals = (stars, watchers, forks);
    }

    fn rest(&self, path: &str, status: u16, headers: &[(&str, &str)], body: Value) {
        self.state
            .lock()
            .unwrap()
            .rest
            .entry(format!("{API}{path}"))
            .or_default()
            .push_back(HttpResponse {
                status,
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: body.to_string().into_bytes(),
            });
    }

    fn user(&self, login: &str, extra: Value) {
        let mut profile = json!({
            "login": login,
            "html_url": format!("https://github.com/{login}"),
            "followers": 1,
            "following": 2,
            "public_repos": 3,
            "created_at": "2015-03-04T05:06:07Z",
        });
        if let (Some(profile), Some(extra)) = (profile.as_object_mut(), extra.as_object()) {
            profile.extend(extra.clone());
        }
        self.rest(&format!("/users/{login}"), 200, &[], profile);
    }

    fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    fn graphql(state: &mut ApiState, body: &[u8]) -> Value {
        let request: Value = serde_json::from_slice(body).unwrap();
        let query = request["query"].as_str().unwrap_or_default();
        let variables = &request["variables"];

        if query.contains("totalCount") {
            state.log.push("totals".into());
            let (s, w, f) = state.totals;
            return json!({"data": {"repository": {
                "stargazers": {"totalCount": s},
                "watchers": {"totalCount": w},
                "forks": {"totalCount": f},
            }}});
        }

        let field = ["stargazers", "watchers", "forks"]
            .into_iter()
            .find(|f| query.contains(&format!("connection: {f}(")))
            .unwrap();
        let cursor = variables["cursor"].as_str();
        state
            .log
            .push(format!("{field} after={}", cursor.unwrap_or("-")));

        let index = cursor
            .and_then(|c| c.strip_prefix('c'))
            .map(|n| n.parse::<usize>().unwrap())
            .unwrap_or(0);
        let pages = state.connections.get(field).cloned().unwrap_or_default();
        let logins = pages.get(index).cloned().unwrap_or_default();
        let nodes: Vec<Value> = logins
            .iter()
            .map(|login| {
                if field == "forks" {
                    json!({"owner": {"login": login}})
                } else {
                    json!({"login": login})
                }
            })
            .collect();
        let end_cursor = (!logins.is_empty()).then(|| format!("c{}", index + 1));

        json!({"data": {"repository": {"connection": {
            "pageInfo": {"hasNextPage": index + 1 < pages.len(), "endCursor": end_cursor},
            "nodes": nodes,
        }}}})
    }
}

#[async_trait]
impl HttpTransport for ScriptedApi {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut state = self.state.lock().unwrap();
        if request.method == HttpMethod::Post {
            let body = Self::graphql(&mut state, &request.body);
            return Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: body.to_string().into_bytes(),
            });
        }

        let path = request.url.trim_start_matches(API).to_string();
        state.log.push(format!("GET {path}"));
        let response = state
            .rest
            .get_mut(&request.url)
            .and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
            .unwrap_or(HttpResponse {
                status: 404,
                headers: Vec::new(),
                body: br#"{"message":"Not Found"}"#.to_vec(),
            });
        Ok(response)
    }
}

fn start() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

async fn context(
    api: &Arc<ScriptedApi>,
    clock: Arc<ManualClock>,
    options: CrawlOptions,
) -> CrawlContext {
    let db = connect_and_migrate("sqlite::memory:")
        .await
        .expect("in-memory database");
    let client = GitHubClient::new(Arc::clone(api) as Arc<dyn HttpTransport>, Some("t0ken".into()))
        .with_api_base(API);

    CrawlContext::builder()
        .client(Arc::new(client))
        .database(Arc::new(db))
        .gateway(Gateway::new(RetryPolicy::default()).with_clock(clock))
        .options(options)
        .build()
        .expect("context")
}

fn contributors_path(page: u32) -> String {
    format!("/repos/acme/widget/contributors?per_page=100&page={page}&anon=false")
}

#[tokio::test]
async fn syncs_every_kind_of_a_repository() {
    let api = Arc::new(ScriptedApi::default());
    api.connection("stargazers", vec![vec!["alice", "bob"]]);
    api.connection("watchers", vec![vec!["alice"]]);
    api.connection("forks", vec![vec!["carol"]]);
    api.totals(2, 1, 1);
    api.rest(
        &contributors_path(1),
        200,
        &[],
        json!([
            {"login": "alice", "type": "User", "contributions": 17},
            {"login": "github-actions[bot]", "type": "Bot", "contributions": 4}
        ]),
    );
    api.rest(&contributors_path(2), 200, &[], json!([]));

    api.user("alice", json!({"name": "Alice", "email": "alice@example.com"}));
    api.user("bob", json!({"blog": ""}));
    api.rest(
        "/users/bob/events/public?per_page=100&page=1",
        200,
        &[],
        json!([
            {"type": "PushEvent", "payload": {"commits": [
                {"author": {"email": "7+bob@users.noreply.github.com"}}
            ]}},
            {"type": "PushEvent", "payload": {"commits": [
                {"author": {"email": "41898282+github-actions[bot]@users.noreply.github.com"}},
                {"author": {"email": "bob@example.net"}}
            ]}}
        ]),
    );
    // carol's profile is missing: persisted as a bare handle.

    let clock = Arc::new(ManualClock::starting_at(start()));
    let ctx = context(&api, clock, CrawlOptions::default()).await;
    let repo = RepoRef::new("acme", "widget");

    let reports = sync_repositories(&ctx, std::slice::from_ref(&repo)).await;
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert!(report.is_ok(), "{:?}", report.error);
    assert_eq!(
        report.totals,
        vec![
            (InteractionKind::Star, 2),
            (InteractionKind::Watch, 1),
            (InteractionKind::Fork, 1),
            (InteractionKind::Contribute, 1),
        ]
    );

    let db = ctx.database();
    let alice = actor::find_document(db, "alice").await.unwrap().unwrap();
    assert_eq!(alice.record.name.as_deref(), Some("Alice"));
    assert_eq!(alice.record.email.as_deref(), Some("alice@example.com"));
    assert_eq!(alice.interactions.len(), 3);
    let contribution = alice
        .interactions
        .iter()
        .find(|e| e.kind == InteractionKind::Contribute)
        .unwrap();
    assert_eq!(contribution.weight, Some(17));

    let bob = actor::find_document(db, "bob").await.unwrap().unwrap();
    assert_eq!(bob.record.email.as_deref(), Some("bob@example.net"));
    assert_eq!(bob.record.blog, None);
    assert_eq!(bob.record.followers, Some(1));

    let carol = actor::find_document(db, "carol").await.unwrap().unwrap();
    assert_eq!(carol.record.profile_url, None);
    assert_eq!(carol.interactions[0].kind, InteractionKind::Fork);

    assert!(actor::find_document(db, "github-actions[bot]").await.unwrap().is_none());

    let stored = checkpoint::load(db, &repo, InteractionKind::Contribute)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.position, Position::Page(1));
    assert!(
        checkpoint::load(db, &repo, InteractionKind::Star)
            .await
            .unwrap()
            .is_none()
    );

    // Alice has a public email, so her events are never scanned.
    assert!(
        !api.log()
            .iter()
            .any(|line| line.starts_with("GET /users/alice/events"))
    );
}

#[tokio::test]
async fn waits_out_an_exhausted_quota() {
    let api = Arc::new(ScriptedApi::default());
    api.connection("stargazers", vec![vec!["dave"]]);
    api.totals(1, 0, 0);

    let reset = start() + chrono::Duration::seconds(120);
    api.rest(
        "/users/dave",
        403,
        &[
            ("x-ratelimit-remaining", "0"),
            ("x-ratelimit-reset", &reset.timestamp().to_string()),
        ],
        json!({"message": "API rate limit exceeded"}),
    );
    api.user("dave", json!({"email": "dave@example.org"}));

    let clock = Arc::new(ManualClock::starting_at(start()));
    let ctx = context(
        &api,
        Arc::clone(&clock),
        CrawlOptions {
            kinds: vec![InteractionKind::Star],
            ..CrawlOptions::default()
        },
    )
    .await;

    let reports = sync_repositories(&ctx, &[RepoRef::new("acme", "widget")]).await;
    assert!(reports[0].is_ok());
    assert_eq!(reports[0].kinds[0].crawl.synced(), 1);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(121)]);

    let dave = actor::find_document(ctx.database(), "dave")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(dave.record.email.as_deref(), Some("dave@example.org"));
}
