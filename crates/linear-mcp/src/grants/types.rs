//! Grant and token records.

use serde::{Deserialize, Serialize};

/// Props attached to a grant and surfaced to tools for the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProps {
    /// Linear access token.
    pub access_token: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl SessionProps {
    /// Props carrying only an access token (stdio mode).
    #[must_use]
    pub fn from_access_token(access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), email: None, user_id: None }
    }

    /// The access token, if non-empty.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        Some(self.access_token.as_str()).filter(|t| !t.is_empty())
    }

    /// The user id, if non-empty.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Persisted grant, keyed `grant:{userId}:{grantId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub id: String,
    pub client_id: String,
    pub user_id: String,
    pub scope: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Unix seconds.
    pub created_at: i64,

    pub props: SessionProps,
    /// SHA-256 of the pending authorization code; cleared once exchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_code_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_code_challenge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_code_challenge_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_code_redirect_uri: Option<String>,
    /// SHA-256 of the current refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_id: Option<String>,
    /// When the current refresh token was issued (unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_issued_at: Option<i64>,
}

impl Grant {
    /// Public projection without secrets.
    #[must_use]
    pub fn summary(&self) -> GrantSummary {
        GrantSummary {
            id: self.id.clone(),
            client_id: self.client_id.clone(),
            user_id: self.user_id.clone(),
            scope: self.scope.clone(),
            metadata: self.metadata.clone(),
            created_at: self.created_at,
        }
    }
}

/// Public view of a grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantSummary {
    pub id: String,
    pub client_id: String,
    pub user_id: String,
    pub scope: Vec<String>,
    pub metadata: serde_json::Value,
    pub created_at: i64,
}

/// Persisted access token, keyed `token:{userId}:{grantId}:{tokenId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    /// SHA-256 of the bearer string.
    pub id: String,
    pub grant_id: String,
    pub user_id: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub grant: TokenGrant,
}

impl TokenRecord {
    /// Whether the token is past its expiry at `now` (unix seconds).
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Copy of the grant fields a token needs to authorize requests on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub client_id: String,
    pub scope: Vec<String>,
    pub props: SessionProps,
}

/// Options for [`super::GrantStore::list_user_grants`].
#[derive(Debug, Clone, Default)]
pub struct GrantListOptions {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

/// A page of items plus an optional continuation cursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    /// Absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// `grant:{user_id}:{grant_id}`
#[must_use]
pub fn grant_key(user_id: &str, grant_id: &str) -> String {
    format!("grant:{user_id}:{grant_id}")
}

/// `grant:{user_id}:`
#[must_use]
pub fn grant_prefix(user_id: &str) -> String {
    format!("grant:{user_id}:")
}

/// `token:{user_id}:{grant_id}:{token_id}`
#[must_use]
pub fn token_key(user_id: &str, grant_id: &str, token_id: &str) -> String {
    format!("token:{user_id}:{grant_id}:{token_id}")
}

/// `token:{user_id}:{grant_id}:`
#[must_use]
pub fn token_prefix(user_id: &str, grant_id: &str) -> String {
    format!("token:{user_id}:{grant_id}:")
}
