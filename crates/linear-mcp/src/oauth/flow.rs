//! The authorize → callback exchange.

use std::sync::Arc;

use serde::Deserialize;

use super::state::StateCodec;
use crate::client::LinearClient;
use crate::config::{Config, oauth};
use crate::error::AuthError;
use crate::grants::SessionProps;
use crate::provider::{AuthorizeParams, CompleteAuthorizationOptions, OAuthHelpers};

/// Query parameters Linear sends to `/auth/callback`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Token endpoint response from Linear; only the access token is used.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Drives the delegated authorization exchange.
///
/// Holds no per-request state: everything needed on callback travels in the
/// `state` parameter.
#[derive(Clone)]
pub struct AuthorizationFlow {
    /// Plain client for the token exchange; codes are single-use so no retries.
    http: reqwest::Client,
    codec: StateCodec,
    provider: Arc<dyn OAuthHelpers>,
    tracker: LinearClient,
    client_id: String,
    client_secret: String,
    authorize_url: String,
    token_url: String,
    callback_url: String,
}

impl AuthorizationFlow {
    /// Create the flow for a server reachable at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(
        config: &Config,
        provider: Arc<dyn OAuthHelpers>,
        tracker: LinearClient,
        base_url: &str,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http,
            codec: StateCodec::new(config.state_secret.as_deref()),
            provider,
            tracker,
            client_id: config.linear_client_id.clone(),
            client_secret: config.linear_client_secret.clone(),
            authorize_url: config.authorize_url.clone(),
            token_url: config.token_url.clone(),
            callback_url: format!("{}{}", base_url.trim_end_matches('/'), oauth::CALLBACK_PATH),
        })
    }

    /// The redirect URI registered with Linear.
    #[must_use]
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// Validate an MCP client's authorization request and build the Linear
    /// authorize URL to redirect to. Nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the request carries no usable client id.
    pub async fn begin_authorization(&self, params: &AuthorizeParams) -> Result<String, AuthError> {
        let request = self.provider.parse_auth_request(params).await.map_err(|e| {
            tracing::warn!(error = %e, "Rejected authorization request");
            AuthError::InvalidRequest
        })?;

        if request.client_id.is_empty() {
            return Err(AuthError::InvalidRequest);
        }

        let state = self.codec.encode(&request)?;

        let mut url = url::Url::parse(&self.authorize_url).map_err(|e| {
            tracing::error!(error = %e, url = %self.authorize_url, "Invalid upstream authorize URL");
            AuthError::InvalidRequest
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("scope", &oauth::SCOPES.join(" "))
            .append_pair("redirect_uri", &self.callback_url)
            .append_pair("state", &state)
            .append_pair("response_type", "code");

        tracing::debug!(client_id = %request.client_id, "Redirecting to Linear authorize");
        Ok(url.into())
    }

    /// Finish the exchange after Linear redirects back; returns the MCP
    /// client's redirect target.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState`, `InvalidCode` or `UpstreamExchangeFailed`.
    pub async fn complete_authorization(&self, query: &CallbackQuery) -> Result<String, AuthError> {
        let state = query.state.as_deref().ok_or(AuthError::InvalidState)?;
        let request = self.codec.decode(state)?;

        let code = query.code.as_deref().filter(|c| !c.is_empty()).ok_or(AuthError::InvalidCode)?;

        let token = self.exchange_code(code).await?;

        let viewer =
            self.tracker.with_access_token(&token.access_token).viewer().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to fetch Linear viewer");
                AuthError::UpstreamExchangeFailed
            })?;

        let options = CompleteAuthorizationOptions {
            scope: request.scope.clone(),
            request,
            user_id: viewer.id.clone(),
            metadata: serde_json::json!({}),
            props: SessionProps {
                access_token: token.access_token,
                email: viewer.email,
                user_id: Some(viewer.id),
            },
        };

        let result = self.provider.complete_authorization(options).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to complete authorization");
            AuthError::UpstreamExchangeFailed
        })?;

        Ok(result.redirect_to)
    }

    /// POST the authorization code to Linear's token endpoint.
    async fn exchange_code(&self, code: &str) -> Result<UpstreamToken, AuthError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("code", code)
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("redirect_uri", &self.callback_url)
            .append_pair("grant_type", "authorization_code")
            // Ask every time so users can switch accounts
            .append_pair("prompt", "consent")
            .finish();

        let response = self
            .http
            .post(&self.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Token exchange request failed");
                AuthError::UpstreamExchangeFailed
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %text, "Linear rejected code exchange");
            return Err(AuthError::UpstreamExchangeFailed);
        }

        response.json::<UpstreamToken>().await.map_err(|e| {
            tracing::error!(error = %e, "Unreadable token exchange response");
            AuthError::UpstreamExchangeFailed
        })
    }
}

impl std::fmt::Debug for AuthorizationFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationFlow")
            .field("callback_url", &self.callback_url)
            .field("codec", &self.codec)
            .finish()
    }
}
