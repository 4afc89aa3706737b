//! Linear GraphQL API client.
//!
//! Provides async HTTP client with:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff for queries; mutations are
//!   sent once
//! - Per-session access tokens (OAuth bearer or personal API key)

pub mod queries;

use std::time::Duration;

use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::{Config, api};
use crate::error::{ClientError, ClientResult};
use crate::models::{
    Connection, CreateIssueInput, Issue, IssueMutationPayload, IssueUpdatePayload, Team,
    TeamFilter, UpdateIssueInput, User, WorkflowState,
};

/// Personal API keys are sent without the `Bearer` scheme.
const API_KEY_PREFIX: &str = "lin_api_";

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

fn join_errors(errors: &[GraphQlError]) -> String {
    errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ")
}

/// Linear API client.
///
/// Cheap to clone; [`Self::with_access_token`] derives a per-session client
/// sharing the same connection pool.
#[derive(Clone)]
pub struct LinearClient {
    /// HTTP client with retry middleware, for queries.
    client: ClientWithMiddleware,

    /// Same pool without retries, for mutations.
    mutations: ClientWithMiddleware,

    /// GraphQL endpoint.
    graphql_url: String,

    /// Access token for the current session.
    access_token: Option<String>,
}

impl LinearClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .gzip(true)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_secs(1), Duration::from_secs(30))
            .build_with_max_retries(config.max_retries);

        let mutations = ClientBuilder::new(client.clone()).build();
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client, mutations, graphql_url: config.graphql_url.clone(), access_token: None })
    }

    /// A copy of this client that authenticates as `access_token`.
    #[must_use]
    pub fn with_access_token(&self, access_token: impl Into<String>) -> Self {
        Self { access_token: Some(access_token.into()), ..self.clone() }
    }

    /// Check if an access token is configured.
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// The authenticated user.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn viewer(&self) -> ClientResult<User> {
        #[derive(Deserialize)]
        struct Data {
            viewer: User,
        }

        let data: Data = self.execute(&queries::viewer(), serde_json::json!({})).await?;
        Ok(data.viewer)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns error on API failure or if the user does not exist.
    pub async fn user(&self, id: &str) -> ClientResult<User> {
        #[derive(Deserialize)]
        struct Data {
            user: Option<User>,
        }

        let data: Data = self.execute(&queries::user(), serde_json::json!({ "id": id })).await?;
        data.user.ok_or_else(|| ClientError::not_found(format!("user {id}")))
    }

    /// List workspace users.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn users(&self) -> ClientResult<Vec<User>> {
        #[derive(Deserialize)]
        struct Data {
            users: Connection<User>,
        }

        let data: Data = self.execute(&queries::users(), serde_json::json!({})).await?;
        Ok(data.users.nodes)
    }

    /// Get a team by ID.
    ///
    /// # Errors
    ///
    /// Returns error on API failure or if the team does not exist.
    pub async fn team(&self, id: &str) -> ClientResult<Team> {
        #[derive(Deserialize)]
        struct Data {
            team: Option<Team>,
        }

        let data: Data = self.execute(&queries::team(), serde_json::json!({ "id": id })).await?;
        data.team.ok_or_else(|| ClientError::not_found(format!("team {id}")))
    }

    /// List teams, optionally filtered.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn teams(&self, filter: Option<&TeamFilter>) -> ClientResult<Vec<Team>> {
        #[derive(Deserialize)]
        struct Data {
            teams: Connection<Team>,
        }

        let data: Data =
            self.execute(&queries::teams(), serde_json::json!({ "filter": filter })).await?;
        Ok(data.teams.nodes)
    }

    /// Get an issue by ID or identifier.
    ///
    /// # Errors
    ///
    /// Returns error on API failure or if the issue does not exist.
    pub async fn issue(&self, id: &str) -> ClientResult<Issue> {
        #[derive(Deserialize)]
        struct Data {
            issue: Option<Issue>,
        }

        let data: Data = self.execute(&queries::issue(), serde_json::json!({ "id": id })).await?;
        data.issue.ok_or_else(|| ClientError::not_found(format!("issue {id}")))
    }

    /// List issues matching an `IssueFilter`.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn issues(&self, filter: serde_json::Value) -> ClientResult<Vec<Issue>> {
        #[derive(Deserialize)]
        struct Data {
            issues: Connection<Issue>,
        }

        let data: Data =
            self.execute(&queries::issues(), serde_json::json!({ "filter": filter })).await?;
        Ok(data.issues.nodes)
    }

    /// Full-text issue search.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn search_issues(&self, term: &str) -> ClientResult<Vec<Issue>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            search_issues: Connection<Issue>,
        }

        let data: Data =
            self.execute(&queries::search_issues(), serde_json::json!({ "term": term })).await?;
        Ok(data.search_issues.nodes)
    }

    /// Create an issue and return it.
    ///
    /// # Errors
    ///
    /// Returns error on API failure or if Linear reports the mutation failed.
    pub async fn create_issue(&self, input: &CreateIssueInput) -> ClientResult<Issue> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            issue_create: IssueMutationPayload,
        }

        let data: Data =
            self.mutate(&queries::issue_create(), serde_json::json!({ "input": input })).await?;

        match data.issue_create {
            IssueMutationPayload { success: true, issue: Some(issue) } => Ok(issue),
            _ => Err(ClientError::graphql("issueCreate did not return an issue")),
        }
    }

    /// Update an issue; returns Linear's success flag.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn update_issue(&self, input: &UpdateIssueInput) -> ClientResult<bool> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            issue_update: IssueUpdatePayload,
        }

        let variables = serde_json::json!({ "id": input.id, "input": input.changes() });
        let data: Data = self.mutate(queries::issue_update(), variables).await?;
        Ok(data.issue_update.success)
    }

    /// List workflow states matching a `WorkflowStateFilter`.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn workflow_states(
        &self,
        filter: serde_json::Value,
    ) -> ClientResult<Vec<WorkflowState>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            workflow_states: Connection<WorkflowState>,
        }

        let data: Data = self
            .execute(&queries::workflow_states(), serde_json::json!({ "filter": filter }))
            .await?;
        Ok(data.workflow_states.nodes)
    }

    /// Run a GraphQL document and decode its `data`.
    async fn execute<T>(&self, query: &str, variables: serde_json::Value) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.send(&self.client, query, variables).await
    }

    /// Run a mutation without retries; a retried 5xx may already have been applied.
    async fn mutate<T>(&self, query: &str, variables: serde_json::Value) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.send(&self.mutations, query, variables).await
    }

    async fn send<T>(
        &self,
        client: &ClientWithMiddleware,
        query: &str,
        variables: serde_json::Value,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let Some(token) = self.access_token.as_deref().filter(|t| !t.is_empty()) else {
            return Err(ClientError::Unauthorized { message: "missing access token".into() });
        };

        let authorization = if token.starts_with(API_KEY_PREFIX) {
            token.to_string()
        } else {
            format!("Bearer {token}")
        };

        let body = serde_json::json!({ "query": query, "variables": variables });
        let body_str = serde_json::to_string(&body)?;

        let response = client
            .post(&self.graphql_url)
            .header("Content-Type", "application/json")
            .header("Authorization", authorization)
            .body(body_str)
            .send()
            .await?;

        let response = self.handle_response(response).await?;
        let envelope: GraphQlResponse<T> = response.json().await?;

        if !envelope.errors.is_empty() {
            return Err(ClientError::graphql(join_errors(&envelope.errors)));
        }

        envelope.data.ok_or_else(|| ClientError::graphql("response carried no data"))
    }

    /// Handle API response status codes.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            401 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::Unauthorized { message: text })
            }
            429 => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);

                Err(ClientError::rate_limited(retry_after))
            }
            404 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::not_found(text))
            }
            400 => {
                // Linear reports invalid queries and variables as 400 with a GraphQL body
                let text = response.text().await.unwrap_or_default();
                match serde_json::from_str::<GraphQlResponse<serde_json::Value>>(&text) {
                    Ok(envelope) if !envelope.errors.is_empty() => {
                        Err(ClientError::graphql(join_errors(&envelope.errors)))
                    }
                    _ => Err(ClientError::bad_request(text)),
                }
            }
            500..=599 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::server(status.as_u16(), text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::UnexpectedStatus { status: status.as_u16(), message: text })
            }
        }
    }
}

impl std::fmt::Debug for LinearClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearClient")
            .field("graphql_url", &self.graphql_url)
            .field("has_access_token", &self.has_access_token())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer, token: &str) -> LinearClient {
        LinearClient::new(&Config::for_testing(&server.uri())).unwrap().with_access_token(token)
    }

    #[tokio::test]
    async fn test_oauth_token_uses_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("Authorization", "Bearer oauth-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"viewer": {"id": "u1", "email": "a@example.com"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let viewer = client_for(&server, "oauth-token").await.viewer().await.unwrap();
        assert_eq!(viewer.id, "u1");
    }

    #[tokio::test]
    async fn test_api_key_sent_raw() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Authorization", "lin_api_abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"users": {"nodes": [{"id": "u1"}, {"id": "u2"}]}}
            })))
            .mount(&server)
            .await;

        let users = client_for(&server, "lin_api_abc").await.users().await.unwrap();
        assert_eq!(users.len(), 2);
    }

    #[tokio::test]
    async fn test_graphql_errors_surface() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": null,
                "errors": [{"message": "Entity not found"}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, "t").await.issue("nope").await.unwrap_err();
        assert!(matches!(err, ClientError::GraphQl { ref message } if message == "Entity not found"));
    }

    #[tokio::test]
    async fn test_null_node_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"team": null}})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server, "t").await.team("t9").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let err = client_for(&server, "t").await.viewer().await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_missing_token_never_hits_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = LinearClient::new(&Config::for_testing(&server.uri())).unwrap();
        assert!(!client.has_access_token());
        assert!(matches!(client.viewer().await, Err(ClientError::Unauthorized { .. })));
    }

    async fn client_with_retries(server: &MockServer, max_retries: u32) -> LinearClient {
        let mut config = Config::for_testing(&server.uri());
        config.max_retries = max_retries;
        LinearClient::new(&config).unwrap().with_access_token("t")
    }

    #[tokio::test]
    async fn test_mutations_are_sent_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_with_retries(&server, api::MAX_RETRIES).await;
        let create = CreateIssueInput {
            title: "x".into(),
            description: None,
            team_id: "t1".into(),
            assignee_id: None,
            cycle_id: None,
            parent_id: None,
            project_milestone_id: None,
            state_id: None,
        };
        let err = client.create_issue(&create).await.unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 503, .. }));

        let update: UpdateIssueInput =
            serde_json::from_value(serde_json::json!({"id": "i1", "title": "y"})).unwrap();
        assert!(client.update_issue(&update).await.is_err());

        // One POST per mutation
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_queries_retry_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_with_retries(&server, 1).await;
        let err = client.viewer().await.unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 503, .. }));
    }
}
