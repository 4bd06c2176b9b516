//! GraphQL documents and response envelopes.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::classify::{SECONDARY_LIMIT_FALLBACK, parse_rate_limit_headers};
use crate::entity::interaction_kind::InteractionKind;
use crate::gateway::Outcome;
use crate::http::HttpResponse;
use crate::source::{ConnectionPage, RepositoryTotals, SourceError};

/// Connection query for a cursor-paginated kind.
///
/// The connection is aliased so every kind decodes into the same shape.
/// Fork nodes are repositories, so the actor is the fork's owner.
pub fn connection_query(kind: InteractionKind) -> Option<String> {
    let (field, projection) = match kind {
        InteractionKind::Star => ("stargazers", "login"),
        InteractionKind::Watch => ("watchers", "login"),
        InteractionKind::Fork => ("forks", "owner { login }"),
        InteractionKind::Contribute => return None,
    };

    Some(format!(
        "query ($owner: String!, $repo: String!, $cursor: String, $first: Int!) {{
  repository(owner: $owner, name: $repo) {{
    connection: {field}(first: $first, after: $cursor) {{
      pageInfo {{ hasNextPage endCursor }}
      nodes {{ {projection} }}
    }}
  }}
}}"
    ))
}

pub const TOTALS_QUERY: &str = "query ($owner: String!, $repo: String!) {
  repository(owner: $owner, name: $repo) {
    stargazers { totalCount }
    watchers { totalCount }
    forks { totalCount }
  }
}";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    message: String,
}

/// Decode a GraphQL response body.
///
/// GraphQL reports its own rate limit and missing-resource errors inside a
/// 200 response; those are mapped onto the same outcome tags as REST.
pub fn decode<T: DeserializeOwned>(response: &HttpResponse, resource: &str) -> Outcome<T> {
    let envelope: Envelope<T> = match serde_json::from_slice(&response.body) {
        Ok(envelope) => envelope,
        Err(e) => return Outcome::Other(e.into()),
    };

    if let Some(error) = envelope.errors.first() {
        match error.error_type.as_deref() {
            Some("RATE_LIMITED") => {
                return match parse_rate_limit_headers(response) {
                    Some(info) => Outcome::RateLimited {
                        reset_at: info.reset_at,
                    },
                    None => Outcome::Throttled {
                        retry_after: SECONDARY_LIMIT_FALLBACK,
                    },
                };
            }
            Some("NOT_FOUND") => return Outcome::Other(SourceError::not_found(resource)),
            _ if envelope.data.is_none() => {
                return Outcome::Other(SourceError::GraphQl {
                    message: error.message.clone(),
                });
            }
            _ => {
                tracing::debug!(resource, error = %error.message, "Partial GraphQL response");
            }
        }
    }

    match envelope.data {
        Some(data) => Outcome::Ok(data),
        None => Outcome::Other(SourceError::decode(format!("{resource}: empty data"))),
    }
}

// ─── Connection page ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ConnectionData {
    repository: Option<ConnectionRepository>,
}

#[derive(Debug, Deserialize)]
struct ConnectionRepository {
    connection: Connection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection {
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<Option<Node>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Node {
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    owner: Option<Owner>,
}

#[derive(Debug, Deserialize)]
struct Owner {
    login: String,
}

impl ConnectionData {
    pub fn into_page(self, resource: &str) -> Result<ConnectionPage, SourceError> {
        let repository = self
            .repository
            .ok_or_else(|| SourceError::not_found(resource))?;
        let connection = repository.connection;

        let logins = connection
            .nodes
            .into_iter()
            .flatten()
            .filter_map(|node| node.login.or(node.owner.map(|o| o.login)))
            .filter(|login| !login.is_empty())
            .collect();

        Ok(ConnectionPage {
            logins,
            has_next_page: connection.page_info.has_next_page,
            end_cursor: connection.page_info.end_cursor,
        })
    }
}

// ─── Totals ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TotalsData {
    repository: Option<TotalsRepository>,
}

#[derive(Debug, Deserialize)]
struct TotalsRepository {
    stargazers: Count,
    watchers: Count,
    forks: Count,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Count {
    total_count: u64,
}

impl TotalsData {
    pub fn into_totals(self, resource: &str) -> Result<RepositoryTotals, SourceError> {
        let repository = self
            .repository
            .ok_or_else(|| SourceError::not_found(resource))?;
        Ok(RepositoryTotals {
            stargazers: repository.stargazers.total_count,
            watchers: repository.watchers.total_count,
            forks: repository.forks.total_count,
        })
    }
}

/// Request body for a query and its variables.
pub fn request_body(query: &str, variables: serde_json::Value) -> Vec<u8> {
    serde_json::json!({ "query": query, "variables": variables })
        .to_string()
        .into_bytes()
}
