//! OAuth 2.0 endpoint handlers.
//!
//! Implements:
//! - RFC 9728: OAuth Protected Resource Metadata
//! - RFC 8414: OAuth Authorization Server Metadata
//! - RFC 7591: Dynamic Client Registration
//! - RFC 6749: Authorization Code and Refresh Token grants

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::config::oauth;
use crate::error::ProviderError;
use crate::oauth::CallbackQuery;
use crate::provider::{AuthorizeParams, TokenResponse, pkce};
use crate::server::transport::HttpState;

fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Invalid redirect").into_response(),
    }
}

// ─── Delegated authorization ─────────────────────────────────────────────────

/// `GET /auth/authorize`
///
/// Validates the MCP client's request and forwards the user to Linear.
pub async fn handle_authorize(
    State(state): State<Arc<HttpState>>,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    match state.flow.begin_authorization(&params).await {
        Ok(location) => found(&location),
        Err(e) => e.into_response(),
    }
}

/// `GET /auth/callback`
///
/// Linear redirects here with `code` and our `state`.
pub async fn handle_callback(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    match state.flow.complete_authorization(&query).await {
        Ok(location) => found(&location),
        Err(e) => e.into_response(),
    }
}

// ─── RFC 9728: Protected Resource Metadata ───────────────────────────────────

/// `GET /.well-known/oauth-protected-resource`
pub async fn handle_protected_resource(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "resource": state.base_url,
        "authorization_servers": [state.base_url],
        "bearer_methods_supported": ["header"],
        "scopes_supported": oauth::SCOPES
    }))
}

// ─── RFC 8414: Authorization Server Metadata ─────────────────────────────────

/// `GET /.well-known/oauth-authorization-server`
pub async fn handle_auth_server_metadata(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "issuer": state.base_url,
        "authorization_endpoint": format!("{}/auth/authorize", state.base_url),
        "token_endpoint": format!("{}/auth/token", state.base_url),
        "registration_endpoint": format!("{}/auth/register", state.base_url),
        "scopes_supported": oauth::SCOPES,
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "token_endpoint_auth_methods_supported": ["none"],
        "code_challenge_methods_supported": pkce::SUPPORTED_METHODS
    }))
}

// ─── RFC 7591: Dynamic Client Registration ───────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub client_name: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

/// `POST /auth/register`
pub async fn handle_register(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<RegisterRequest>,
) -> Response {
    let client = match state.provider.register_client(req.client_name, req.redirect_uris).await {
        Ok(client) => client,
        Err(e) => return provider_error(e),
    };

    tracing::info!(client_id = %client.client_id, "Registered OAuth client");

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "client_id": client.client_id,
            "client_name": client.client_name,
            "redirect_uris": client.redirect_uris,
            "client_id_issued_at": client.registration_date,
            "grant_types": ["authorization_code", "refresh_token"],
            "response_types": ["code"],
            "token_endpoint_auth_method": "none"
        })),
    )
        .into_response()
}

// ─── Token Endpoint ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub client_id: Option<String>,
    pub refresh_token: Option<String>,
}

/// `POST /auth/token`
pub async fn handle_token(
    State(state): State<Arc<HttpState>>,
    Form(form): Form<TokenRequest>,
) -> Response {
    let result = match form.grant_type.as_str() {
        "authorization_code" => {
            let Some(ref code) = form.code else {
                return provider_error(ProviderError::InvalidRequest("Missing code".into()));
            };
            state
                .provider
                .exchange_authorization_code(
                    code,
                    form.client_id.as_deref(),
                    form.redirect_uri.as_deref(),
                    form.code_verifier.as_deref(),
                )
                .await
        }
        "refresh_token" => {
            let Some(ref refresh_token) = form.refresh_token else {
                return provider_error(ProviderError::InvalidRequest(
                    "Missing refresh_token".into(),
                ));
            };
            state.provider.exchange_refresh_token(refresh_token, form.client_id.as_deref()).await
        }
        other => Err(ProviderError::UnsupportedGrantType(other.to_string())),
    };

    match result {
        Ok(tokens) => token_success(&tokens),
        Err(e) => provider_error(e),
    }
}

/// Token response with the cache headers required by RFC 6749 §5.1.
fn token_success(tokens: &TokenResponse) -> Response {
    let mut response = Json(tokens).into_response();

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

fn provider_error(error: ProviderError) -> Response {
    if matches!(error, ProviderError::Store(_)) {
        tracing::error!(error = %error, "OAuth provider store failure");
    } else {
        tracing::debug!(error = %error, "OAuth request rejected");
    }
    error.into_response()
}
