//! HTTP transport.
//!
//! JSON-RPC 2.0 over HTTP with:
//! - Streamable `/mcp` endpoint and legacy `/sse` + `/message` endpoints
//! - Bearer authentication against tokens issued by the OAuth provider
//! - Per-session mailboxes with Last-Event-ID replay
//! - The OAuth authorize/callback, registration, token and metadata routes

use std::borrow::Cow;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::oauth::handlers;
use super::session::{BufferedEvent, Session, SessionManager};
use crate::grants::SessionProps;
use crate::oauth::AuthorizationFlow;
use crate::provider::OAuthHelpers;
use crate::tools::{self, McpTool, ToolContext};

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    const VERSION: &'static str = "2.0";

    #[must_use]
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self { jsonrpc: Cow::Borrowed(Self::VERSION), result: Some(result), error: None, id }
    }

    #[must_use]
    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(Self::VERSION),
            result: None,
            error: Some(JsonRpcError { code, message: message.into(), data: None }),
            id,
        }
    }
}

/// MCP tool info for tools/list response.
#[derive(Debug, Serialize)]
pub struct McpToolInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// `sessionId` query parameter of the MCP endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Shared state for HTTP handlers.
pub struct HttpState {
    pub tools: Vec<Box<dyn McpTool>>,
    /// Context without session props; bound per request.
    pub ctx: ToolContext,
    pub sessions: Arc<SessionManager>,
    pub provider: Arc<dyn OAuthHelpers>,
    pub flow: AuthorizationFlow,
    /// Public base URL for metadata and endpoint announcements.
    pub base_url: String,
}

/// Create the HTTP router.
pub fn create_router(state: HttpState) -> Router {
    Arc::clone(&state.sessions).start_cleanup_task();
    let state = Arc::new(state);

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        // Streamable HTTP transport
        .route("/mcp", post(handle_mcp_post).get(handle_mcp_get))
        // Legacy SSE transport
        .route("/sse", get(handle_sse_legacy))
        .route("/message", post(handle_message_post))
        // Delegated authorization against Linear
        .route("/auth/authorize", get(handlers::handle_authorize))
        .route("/auth/callback", get(handlers::handle_callback))
        // OAuth provider for MCP clients
        .route("/.well-known/oauth-protected-resource", get(handlers::handle_protected_resource))
        .route("/.well-known/oauth-authorization-server", get(handlers::handle_auth_server_metadata))
        .route("/auth/register", post(handlers::handle_register))
        .route("/register", post(handlers::handle_register))
        .route("/auth/token", post(handlers::handle_token))
        .route("/token", post(handlers::handle_token))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "linear-mcp",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 401 pointing the client at the protected resource metadata (RFC 9728 §5.1).
fn unauthorized(base_url: &str, description: &str) -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "invalid_token",
            "error_description": description
        })),
    )
        .into_response();

    let challenge =
        format!(r#"Bearer resource_metadata="{base_url}/.well-known/oauth-protected-resource""#);
    if let Ok(value) = HeaderValue::from_str(&challenge) {
        response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
    }
    response
}

/// Resolve the request's bearer token to session props.
async fn authenticate(state: &HttpState, headers: &HeaderMap) -> Result<SessionProps, Response> {
    let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() else {
        return Err(unauthorized(&state.base_url, "Missing bearer token"));
    };

    match state.provider.unwrap_token(bearer.token()).await {
        Ok(Some(record)) => Ok(record.grant.props),
        Ok(None) => Err(unauthorized(&state.base_url, "Invalid or expired token")),
        Err(e) => {
            tracing::error!(error = %e, "Token lookup failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response())
        }
    }
}

/// Session id from `?sessionId=` or the `Mcp-Session-Id` header.
fn requested_session_id<'a>(query: &'a SessionQuery, headers: &'a HeaderMap) -> Option<&'a str> {
    query
        .session_id
        .as_deref()
        .or_else(|| headers.get("Mcp-Session-Id").and_then(|v| v.to_str().ok()))
}

fn with_session_header(mut response: Response, session: &Session) -> Response {
    if let Ok(value) = HeaderValue::from_str(&session.id) {
        response.headers_mut().insert("Mcp-Session-Id", value);
    }
    response
}

fn last_event_id(headers: &HeaderMap) -> u64 {
    headers
        .get("Last-Event-ID")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Handle POST requests to /mcp (Streamable HTTP transport)
async fn handle_mcp_post(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
    Json(req): Json<JsonRpcRequest>,
) -> Response {
    let props = match authenticate(&state, &headers).await {
        Ok(props) => props,
        Err(response) => return response,
    };

    tracing::debug!(method = %req.method, "Handling MCP POST request");

    let session = state
        .sessions
        .get_or_create_session(requested_session_id(&query, &headers), props.user_id())
        .await;
    let ctx = state.ctx.with_props(Some(props));

    let Some(response) = dispatch(&req, &state.tools, &ctx).await else {
        return with_session_header(StatusCode::ACCEPTED.into_response(), &session);
    };

    // Tool results are also mailed to the session for SSE replay
    if req.method == "tools/call" {
        if let Ok(event_data) = serde_json::to_string(&response) {
            session.push_event("message", event_data).await;
        }
    }

    with_session_header(Json(response).into_response(), &session)
}

/// Handle POST requests to /message (legacy transport)
async fn handle_message_post(
    state: State<Arc<HttpState>>,
    query: Query<SessionQuery>,
    headers: HeaderMap,
    req: Json<JsonRpcRequest>,
) -> Response {
    handle_mcp_post(state, query, headers, req).await
}

/// Handle GET requests to /mcp (SSE stream for server-initiated messages)
async fn handle_mcp_get(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Response {
    let props = match authenticate(&state, &headers).await {
        Ok(props) => props,
        Err(response) => return response,
    };

    let last_event_id = last_event_id(&headers);
    let session = state
        .sessions
        .get_or_create_session(requested_session_id(&query, &headers), props.user_id())
        .await;

    tracing::info!(session_id = %session.id, last_event_id, "New SSE stream connection");

    let stream = build_sse_stream(Arc::clone(&session), last_event_id).await;

    let response = (
        [("X-Accel-Buffering", "no"), ("Cache-Control", "no-cache, no-store, must-revalidate")],
        Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping")),
    )
        .into_response();
    with_session_header(response, &session)
}

/// Replay missed events, then follow live ones.
async fn build_sse_stream(
    session: Arc<Session>,
    last_event_id: u64,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let missed_events = session.get_events_after(last_event_id).await;
    let replay_stream = stream::iter(missed_events.into_iter().map(|e| {
        tracing::debug!(event_id = e.id, "Replaying missed event");
        Ok::<_, Infallible>(e.to_sse_event())
    }));

    let live_stream = BroadcastStream::new(session.subscribe()).filter_map(
        |result: Result<BufferedEvent, _>| async move {
            match result {
                Ok(event) => Some(Ok(event.to_sse_event())),
                Err(e) => {
                    tracing::debug!(error = %e, "Broadcast lag, client will catch up");
                    None
                }
            }
        },
    );

    replay_stream.chain(live_stream)
}

/// Legacy SSE endpoint: opens a session and announces its `/message` URL.
async fn handle_sse_legacy(State(state): State<Arc<HttpState>>, headers: HeaderMap) -> Response {
    let props = match authenticate(&state, &headers).await {
        Ok(props) => props,
        Err(response) => return response,
    };

    let session = state.sessions.create_session(props.user_id()).await;
    let endpoint = format!("{}/message?sessionId={}", state.base_url, session.id);

    tracing::info!(session_id = %session.id, "New legacy SSE connection");

    let endpoint_event = Event::default().id("0").event("endpoint").data(endpoint);
    let stream = stream::iter([Ok::<_, Infallible>(endpoint_event)])
        .chain(build_sse_stream(Arc::clone(&session), 0).await);

    (
        [
            ("X-Accel-Buffering", "no"),
            ("Cache-Control", "no-cache, no-store, must-revalidate"),
            ("Connection", "keep-alive"),
        ],
        Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping")),
    )
        .into_response()
}

/// Dispatch one JSON-RPC message. Returns `None` for notifications.
pub async fn dispatch(
    req: &JsonRpcRequest,
    tools: &[Box<dyn McpTool>],
    ctx: &ToolContext,
) -> Option<JsonRpcResponse> {
    let is_notification = req.id.is_none();
    let id = req.id.clone();

    let response = match req.method.as_str() {
        "initialize" => JsonRpcResponse::success(id, handle_initialize(&req.params)),
        "tools/list" => handle_tools_list(id, tools),
        "tools/call" => handle_tools_call(id, &req.params, tools, ctx).await,
        "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
        _ if is_notification => return None,
        "notifications/initialized" | "initialized" | "notifications/cancelled" => {
            JsonRpcResponse::success(id, serde_json::json!({}))
        }
        _ => JsonRpcResponse::error(id, -32601, format!("Method not found: {}", req.method)),
    };

    Some(response)
}

fn handle_initialize(params: &serde_json::Value) -> serde_json::Value {
    let protocol_version =
        params.get("protocolVersion").and_then(|v| v.as_str()).unwrap_or("2024-11-05");

    tracing::info!("MCP initialize: protocol version {}", protocol_version);

    serde_json::json!({
        "protocolVersion": protocol_version,
        "capabilities": {
            "tools": {
                "listChanged": false
            }
        },
        "serverInfo": {
            "name": "linear-mcp",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn handle_tools_list(id: Option<serde_json::Value>, tools: &[Box<dyn McpTool>]) -> JsonRpcResponse {
    let tool_list: Vec<McpToolInfo> = tools
        .iter()
        .map(|t| McpToolInfo {
            name: t.name().to_string(),
            description: t.description().to_string(),
            input_schema: t.input_schema(),
        })
        .collect();

    JsonRpcResponse::success(id, serde_json::json!({ "tools": tool_list }))
}

async fn handle_tools_call(
    id: Option<serde_json::Value>,
    params: &serde_json::Value,
    tools: &[Box<dyn McpTool>],
    ctx: &ToolContext,
) -> JsonRpcResponse {
    let Some(tool_name) = params.get("name").and_then(|v| v.as_str()) else {
        return JsonRpcResponse::error(id, -32602, "Missing 'name' parameter");
    };

    let Some(tool) = tools::find_tool(tools, tool_name) else {
        return JsonRpcResponse::error(id, -32602, format!("Tool not found: {tool_name}"));
    };

    let arguments = params
        .get("arguments")
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));

    let output = tools::call_tool(tool, ctx, arguments).await;
    JsonRpcResponse::success(id, output.to_result())
}
