//! GitHub GraphQL API v4.

use crate::client::GitHubClient;
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Page size used when walking connections.
pub const GRAPHQL_PAGE_SIZE: u32 = 100;

/// Executes documents against the `/graphql` endpoint.
pub struct GraphQLService<'a> {
    client: &'a GitHubClient,
}

impl<'a> GraphQLService<'a> {
    /// Creates a new GraphQL service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Runs a query or mutation and decodes its `data`.
    pub async fn query<T: DeserializeOwned>(
        &self,
        document: &str,
        variables: Value,
    ) -> GitHubResult<T> {
        let request = GraphQLRequest {
            query: document,
            variables,
        };
        let raw: RawResponse = self.client.post_graphql(&request).await?;
        let data = raw.into_data()?;

        serde_json::from_value(data).map_err(|e| {
            GitHubError::deserialization(format!("Failed to deserialize GraphQL data: {}", e))
        })
    }

    /// Walks a cursor-paginated connection and collects every node.
    ///
    /// `document` must declare `$first: Int!` and `$after: String` and select
    /// `nodes` plus `pageInfo { hasNextPage endCursor }` on the connection at
    /// `connection_pointer`, a JSON pointer into `data` such as
    /// `/organization/teams`.
    pub async fn query_all_nodes<T: DeserializeOwned>(
        &self,
        document: &str,
        variables: Value,
        connection_pointer: &str,
    ) -> GitHubResult<Vec<T>> {
        let base = match variables {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let mut nodes = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut vars = base.clone();
            vars.insert("first".into(), GRAPHQL_PAGE_SIZE.into());
            vars.insert("after".into(), after.take().map_or(Value::Null, Value::String));

            let data: Value = self.query(document, Value::Object(vars)).await?;
            let connection = match data.pointer(connection_pointer) {
                Some(Value::Null) => {
                    return Err(GitHubError::not_found(format!(
                        "GraphQL connection {} is null",
                        connection_pointer
                    )))
                }
                Some(connection) => connection.clone(),
                None => {
                    return Err(GitHubError::new(
                        GitHubErrorKind::Query,
                        format!("GraphQL response has no connection at {}", connection_pointer),
                    ))
                }
            };

            let page: Connection<T> = serde_json::from_value(connection).map_err(|e| {
                GitHubError::deserialization(format!("Failed to deserialize GraphQL nodes: {}", e))
            })?;
            nodes.extend(page.nodes);

            match page.page_info.end_cursor {
                Some(cursor) if page.page_info.has_next_page => after = Some(cursor),
                _ => break,
            }
        }

        Ok(nodes)
    }
}

#[derive(Serialize)]
struct GraphQLRequest<'q> {
    query: &'q str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    errors: Vec<RawError>,
    extensions: Option<Extensions>,
}

#[derive(Debug, Deserialize)]
struct RawError {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Extensions {
    #[serde(rename = "rateLimit")]
    rate_limit: Option<QueryCost>,
}

#[derive(Debug, Deserialize)]
struct QueryCost {
    remaining: u32,
    cost: Option<u32>,
}

impl RawResponse {
    /// Typed errors fail the call even when partial data is present; untyped
    /// ones only when there is no data at all.
    fn into_data(self) -> GitHubResult<Value> {
        if let Some(QueryCost { remaining, cost }) = self.extensions.and_then(|e| e.rate_limit) {
            tracing::trace!(remaining, cost = cost.unwrap_or_default(), "GraphQL rate limit");
        }

        for err in &self.errors {
            let kind = match err.error_type.as_deref() {
                Some("RATE_LIMITED") => GitHubErrorKind::RateLimited,
                Some("MAX_NODE_LIMIT_EXCEEDED") => GitHubErrorKind::Query,
                Some("FORBIDDEN") => GitHubErrorKind::Forbidden,
                Some("NOT_FOUND") => return Err(GitHubError::not_found(err.message.clone())),
                _ => continue,
            };
            return Err(GitHubError::new(kind, format!("GraphQL {}: {}", kind, err.message)));
        }

        if self.data.is_null() {
            let message = if self.errors.is_empty() {
                "GraphQL response contains no data".to_string()
            } else {
                self.errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            return Err(GitHubError::new(GitHubErrorKind::Query, message));
        }

        Ok(self.data)
    }
}

/// A connection page: `{ nodes: [...], pageInfo: {...} }`.
#[derive(Debug, Deserialize)]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
    #[serde(rename = "endCursor")]
    end_cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_not_found_error_maps_to_404() {
        let err = raw(json!({
            "data": {"organization": null},
            "errors": [{"type": "NOT_FOUND", "message": "Could not resolve to an Organization"}]
        }))
        .into_data()
        .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.status_code(), Some(404));
    }

    #[test]
    fn test_errors_without_data_fail() {
        let err = raw(json!({
            "errors": [{"message": "Field 'x' doesn't exist"}, {"message": "Variable $y unused"}]
        }))
        .into_data()
        .unwrap_err();

        assert_eq!(err.kind(), &GitHubErrorKind::Query);
        assert_eq!(err.message(), "Field 'x' doesn't exist; Variable $y unused");
    }

    #[test]
    fn test_untyped_errors_keep_partial_data() {
        let data = raw(json!({
            "data": {"viewer": {"login": "octocat"}},
            "errors": [{"message": "Resource not accessible by integration"}],
            "extensions": {"rateLimit": {"remaining": 4990, "cost": 1}}
        }))
        .into_data()
        .unwrap();

        assert_eq!(data["viewer"]["login"], "octocat");
    }

    #[test]
    fn test_connection_deserialize() {
        let page: Connection<String> = serde_json::from_value(json!({
            "nodes": ["a", "b"],
            "pageInfo": {"hasNextPage": true, "endCursor": "Y3Vy"}
        }))
        .unwrap();

        assert_eq!(page.nodes, vec!["a", "b"]);
        assert!(page.page_info.has_next_page);
        assert_eq!(page.page_info.end_cursor.as_deref(), Some("Y3Vy"));
    }
}
