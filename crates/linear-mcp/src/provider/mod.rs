//! OAuth 2.0 authorization provider for MCP clients.
//!
//! MCP clients (Claude, IDEs) authenticate against this server, not against
//! Linear. The provider owns client registration, authorization codes, PKCE
//! and token issuance; the authorization flow in [`crate::oauth`] only calls
//! [`OAuthHelpers::parse_auth_request`] and
//! [`OAuthHelpers::complete_authorization`].
//!
//! ## Supported Standards
//! - RFC 8414: OAuth Authorization Server Metadata
//! - RFC 9728: OAuth Protected Resource Metadata
//! - RFC 7591: Dynamic Client Registration
//! - RFC 7636: PKCE (S256, plain)
//! - RFC 6749: Authorization Code and Refresh Token grants

mod kv;
pub mod pkce;
mod types;

pub use kv::KvOAuthProvider;
pub use types::{
    AuthRequest, AuthorizeParams, ClientInfo, CompleteAuthorizationOptions,
    CompleteAuthorizationResult, TokenResponse,
};

use crate::error::ProviderResult;
use crate::grants::TokenRecord;

/// The provider surface used by the HTTP layer and the authorization flow.
#[async_trait::async_trait]
pub trait OAuthHelpers: Send + Sync {
    /// Validate an inbound `/auth/authorize` request.
    async fn parse_auth_request(&self, params: &AuthorizeParams) -> ProviderResult<AuthRequest>;

    /// Look up a registered client.
    async fn lookup_client(&self, client_id: &str) -> ProviderResult<Option<ClientInfo>>;

    /// Register a new client (RFC 7591).
    async fn register_client(
        &self,
        client_name: Option<String>,
        redirect_uris: Vec<String>,
    ) -> ProviderResult<ClientInfo>;

    /// Persist a grant for an approved request and return the client redirect.
    async fn complete_authorization(
        &self,
        options: CompleteAuthorizationOptions,
    ) -> ProviderResult<CompleteAuthorizationResult>;

    /// `grant_type=authorization_code`
    async fn exchange_authorization_code(
        &self,
        code: &str,
        client_id: Option<&str>,
        redirect_uri: Option<&str>,
        code_verifier: Option<&str>,
    ) -> ProviderResult<TokenResponse>;

    /// `grant_type=refresh_token`
    async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
        client_id: Option<&str>,
    ) -> ProviderResult<TokenResponse>;

    /// Resolve a bearer token to its live token record.
    ///
    /// Returns `None` for unknown, malformed or expired tokens.
    async fn unwrap_token(&self, bearer: &str) -> ProviderResult<Option<TokenRecord>>;
}
