//! OAuth 2.0 types exchanged with the provider.

use serde::{Deserialize, Serialize};

use crate::grants::SessionProps;

/// Raw `/auth/authorize` query parameters as sent by an MCP client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeParams {
    pub response_type: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

/// A validated, pending authorization request.
///
/// Serialized into the upstream `state` parameter and decoded on callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub response_type: String,
    #[serde(default)]
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,
}

/// Inputs for [`super::OAuthHelpers::complete_authorization`].
#[derive(Debug, Clone)]
pub struct CompleteAuthorizationOptions {
    pub request: AuthRequest,
    pub user_id: String,
    pub scope: Vec<String>,
    pub metadata: serde_json::Value,
    pub props: SessionProps,
}

/// Where to send the user agent once a grant exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteAuthorizationResult {
    pub redirect_to: String,
}

/// A dynamically registered OAuth client, keyed `client:{clientId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub client_id: String,
    #[serde(default)]
    pub client_name: Option<String>,
    pub redirect_uris: Vec<String>,
    pub registration_date: i64,
}

/// Token endpoint response (RFC 6749 §5.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub scope: String,
}
