//! Key-value backed OAuth provider.
//!
//! Codes and tokens have the shape `{userId}:{grantId}:{secret}`. Only their
//! SHA-256 is stored, so the key-value namespace never holds a usable credential.

use std::sync::Arc;

use futures::future::try_join_all;
use sha2::{Digest, Sha256};

use super::pkce;
use super::types::{
    AuthRequest, AuthorizeParams, ClientInfo, CompleteAuthorizationOptions,
    CompleteAuthorizationResult, TokenResponse,
};
use super::OAuthHelpers;
use crate::config::Config;
use crate::error::{ProviderError, ProviderResult, StoreResult};
use crate::grants::{
    Grant, GrantListOptions, GrantStore, GrantSummary, KvGrantStore, ListResult, TokenGrant,
    TokenRecord, grant_key, token_key, token_prefix,
};
use crate::kv::{self, KvListOptions, KvStore};

/// OAuth provider storing clients, grants and tokens in a [`KvStore`].
#[derive(Clone)]
pub struct KvOAuthProvider {
    kv: Arc<dyn KvStore>,
    grants: KvGrantStore,
    access_token_ttl_secs: i64,
    refresh_token_ttl_secs: i64,
}

impl KvOAuthProvider {
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>, config: &Config) -> Self {
        Self {
            grants: KvGrantStore::new(Arc::clone(&kv)),
            kv,
            access_token_ttl_secs: config.access_token_ttl_secs,
            refresh_token_ttl_secs: config.refresh_token_ttl_secs,
        }
    }

    /// Generate a random secret using two UUIDs (256 bits).
    fn generate_secret() -> String {
        format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
    }

    fn hash(value: &str) -> String {
        format!("{:x}", Sha256::digest(value.as_bytes()))
    }

    /// Split `{userId}:{grantId}:{secret}`.
    fn parse_credential(value: &str) -> Option<(&str, &str)> {
        let mut parts = value.splitn(3, ':');
        let user_id = parts.next().filter(|s| !s.is_empty())?;
        let grant_id = parts.next().filter(|s| !s.is_empty())?;
        parts.next().filter(|s| !s.is_empty())?;
        Some((user_id, grant_id))
    }

    fn client_key(client_id: &str) -> String {
        format!("client:{client_id}")
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    async fn load_grant(&self, user_id: &str, grant_id: &str) -> ProviderResult<Option<Grant>> {
        Ok(kv::get_json(self.kv.as_ref(), &grant_key(user_id, grant_id)).await?)
    }

    /// Issue a fresh access token plus a rotated refresh token for `grant`.
    async fn issue_tokens(&self, grant: &mut Grant) -> ProviderResult<TokenResponse> {
        let now = Self::now();
        let access_token = format!("{}:{}:{}", grant.user_id, grant.id, Self::generate_secret());
        let refresh_token = format!("{}:{}:{}", grant.user_id, grant.id, Self::generate_secret());

        let record = TokenRecord {
            id: Self::hash(&access_token),
            grant_id: grant.id.clone(),
            user_id: grant.user_id.clone(),
            created_at: now,
            expires_at: now + self.access_token_ttl_secs,
            grant: TokenGrant {
                client_id: grant.client_id.clone(),
                scope: grant.scope.clone(),
                props: grant.props.clone(),
            },
        };
        kv::put_json(
            self.kv.as_ref(),
            &token_key(&grant.user_id, &grant.id, &record.id),
            &record,
        )
        .await?;

        grant.refresh_token_id = Some(Self::hash(&refresh_token));
        grant.refresh_token_issued_at = Some(now);
        kv::put_json(self.kv.as_ref(), &grant_key(&grant.user_id, &grant.id), grant).await?;

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.access_token_ttl_secs,
            refresh_token,
            scope: grant.scope.join(" "),
        })
    }

    /// Delete the grant's access tokens that are past their expiry.
    ///
    /// Unreadable records are left for `revoke_grant` to remove.
    async fn prune_expired_tokens(&self, user_id: &str, grant_id: &str) -> ProviderResult<usize> {
        let now = Self::now();
        let mut cursor = None;
        let mut expired = Vec::new();

        loop {
            let page = self
                .kv
                .list(KvListOptions {
                    prefix: token_prefix(user_id, grant_id),
                    limit: None,
                    cursor: cursor.take(),
                })
                .await?;

            for key in page.keys {
                match kv::get_json::<TokenRecord>(self.kv.as_ref(), &key.name).await {
                    Ok(Some(record)) if record.is_expired_at(now) => expired.push(key.name.clone()),
                    Ok(_) => {}
                    Err(e) => tracing::warn!(key = %key.name, error = %e, "Skipping unreadable token"),
                }
            }

            if page.list_complete {
                break;
            }
            cursor = page.cursor;
        }

        try_join_all(expired.iter().map(|key| self.kv.delete(key))).await?;
        if !expired.is_empty() {
            tracing::debug!(grant_id = %grant_id, pruned = expired.len(), "Pruned expired tokens");
        }
        Ok(expired.len())
    }

    fn check_client(grant: &Grant, client_id: Option<&str>) -> ProviderResult<()> {
        match client_id {
            Some(id) if id != grant.client_id => {
                Err(ProviderError::InvalidGrant("Client ID mismatch".to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl OAuthHelpers for KvOAuthProvider {
    async fn parse_auth_request(&self, params: &AuthorizeParams) -> ProviderResult<AuthRequest> {
        if params.response_type.as_deref() != Some("code") {
            return Err(ProviderError::InvalidRequest("response_type must be 'code'".to_string()));
        }

        let Some(client_id) = params.client_id.as_deref().filter(|id| !id.is_empty()) else {
            return Err(ProviderError::InvalidRequest("Missing client_id".to_string()));
        };

        let Some(client) = self.lookup_client(client_id).await? else {
            return Err(ProviderError::InvalidClient("Unknown client_id".to_string()));
        };

        let redirect_uri = match params.redirect_uri.as_deref() {
            Some(uri) => uri.to_owned(),
            // A single registered URI may be omitted (RFC 6749 §3.1.2.3)
            None if client.redirect_uris.len() == 1 => client.redirect_uris[0].clone(),
            None => return Err(ProviderError::InvalidRequest("Missing redirect_uri".to_string())),
        };
        if !client.redirect_uris.iter().any(|u| *u == redirect_uri) {
            return Err(ProviderError::InvalidRequest(
                "redirect_uri not registered for this client".to_string(),
            ));
        }

        let code_challenge = params.code_challenge.clone().filter(|c| !c.is_empty());
        let code_challenge_method = match (&code_challenge, params.code_challenge_method.as_deref())
        {
            (None, _) => None,
            (Some(_), None) => Some("plain".to_string()),
            (Some(_), Some(method)) if pkce::SUPPORTED_METHODS.contains(&method) => {
                Some(method.to_string())
            }
            (Some(_), Some(method)) => {
                return Err(ProviderError::InvalidRequest(format!(
                    "Unsupported code_challenge_method: {method}"
                )));
            }
        };

        let scope = params
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default();

        Ok(AuthRequest {
            response_type: "code".to_string(),
            client_id: client.client_id,
            redirect_uri,
            scope,
            state: params.state.clone().unwrap_or_default(),
            code_challenge,
            code_challenge_method,
        })
    }

    async fn lookup_client(&self, client_id: &str) -> ProviderResult<Option<ClientInfo>> {
        Ok(kv::get_json(self.kv.as_ref(), &Self::client_key(client_id)).await?)
    }

    async fn register_client(
        &self,
        client_name: Option<String>,
        redirect_uris: Vec<String>,
    ) -> ProviderResult<ClientInfo> {
        if redirect_uris.is_empty() {
            return Err(ProviderError::InvalidClientMetadata(
                "redirect_uris is required".to_string(),
            ));
        }
        if let Some(bad) = redirect_uris.iter().find(|u| url::Url::parse(u).is_err()) {
            return Err(ProviderError::InvalidClientMetadata(format!(
                "Invalid redirect URI: {bad}"
            )));
        }

        let client = ClientInfo {
            client_id: uuid::Uuid::new_v4().simple().to_string(),
            client_name,
            redirect_uris,
            registration_date: Self::now(),
        };
        kv::put_json(self.kv.as_ref(), &Self::client_key(&client.client_id), &client).await?;

        Ok(client)
    }

    async fn complete_authorization(
        &self,
        options: CompleteAuthorizationOptions,
    ) -> ProviderResult<CompleteAuthorizationResult> {
        let CompleteAuthorizationOptions { request, user_id, scope, metadata, props } = options;

        let mut redirect = url::Url::parse(&request.redirect_uri)
            .map_err(|e| ProviderError::InvalidRequest(format!("Invalid redirect_uri: {e}")))?;

        let grant_id = uuid::Uuid::new_v4().simple().to_string();
        let code = format!("{}:{}:{}", user_id, grant_id, Self::generate_secret());

        let grant = Grant {
            id: grant_id,
            client_id: request.client_id,
            user_id,
            scope,
            metadata,
            created_at: Self::now(),
            props,
            auth_code_id: Some(Self::hash(&code)),
            auth_code_challenge: request.code_challenge,
            auth_code_challenge_method: request.code_challenge_method,
            auth_code_redirect_uri: Some(request.redirect_uri),
            refresh_token_id: None,
            refresh_token_issued_at: None,
        };
        kv::put_json(self.kv.as_ref(), &grant_key(&grant.user_id, &grant.id), &grant).await?;

        tracing::info!(
            client_id = %grant.client_id,
            user_id = %grant.user_id,
            grant_id = %grant.id,
            "Created grant"
        );

        {
            let mut query = redirect.query_pairs_mut();
            query.append_pair("code", &code);
            if !request.state.is_empty() {
                query.append_pair("state", &request.state);
            }
        }

        Ok(CompleteAuthorizationResult { redirect_to: redirect.into() })
    }

    async fn exchange_authorization_code(
        &self,
        code: &str,
        client_id: Option<&str>,
        redirect_uri: Option<&str>,
        code_verifier: Option<&str>,
    ) -> ProviderResult<TokenResponse> {
        let invalid = || ProviderError::InvalidGrant("Invalid or expired authorization code".into());

        let (user_id, grant_id) = Self::parse_credential(code).ok_or_else(invalid)?;
        let mut grant = self.load_grant(user_id, grant_id).await?.ok_or_else(invalid)?;

        if grant.auth_code_id.as_deref() != Some(Self::hash(code).as_str()) {
            return Err(invalid());
        }
        Self::check_client(&grant, client_id)?;

        if let (Some(expected), Some(given)) = (grant.auth_code_redirect_uri.as_deref(), redirect_uri)
        {
            if expected != given {
                return Err(ProviderError::InvalidGrant("redirect_uri mismatch".to_string()));
            }
        }

        if let Some(challenge) = grant.auth_code_challenge.as_deref() {
            let Some(verifier) = code_verifier else {
                return Err(ProviderError::InvalidRequest("Missing code_verifier".to_string()));
            };
            let method = grant.auth_code_challenge_method.as_deref().unwrap_or("plain");
            if !pkce::verify(method, verifier, challenge) {
                return Err(ProviderError::InvalidGrant("PKCE verification failed".to_string()));
            }
        }

        // One-time use: the code is gone once the grant is rewritten below
        grant.auth_code_id = None;
        grant.auth_code_challenge = None;
        grant.auth_code_challenge_method = None;
        grant.auth_code_redirect_uri = None;

        let tokens = self.issue_tokens(&mut grant).await?;
        tracing::info!(client_id = %grant.client_id, grant_id = %grant.id, "Issued token pair");
        Ok(tokens)
    }

    async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
        client_id: Option<&str>,
    ) -> ProviderResult<TokenResponse> {
        let invalid = || ProviderError::InvalidGrant("Invalid or expired refresh token".into());

        let (user_id, grant_id) = Self::parse_credential(refresh_token).ok_or_else(invalid)?;
        let mut grant = self.load_grant(user_id, grant_id).await?.ok_or_else(invalid)?;

        if grant.refresh_token_id.as_deref() != Some(Self::hash(refresh_token).as_str()) {
            return Err(invalid());
        }
        let issued_at = grant.refresh_token_issued_at.unwrap_or(grant.created_at);
        if Self::now() - issued_at > self.refresh_token_ttl_secs {
            return Err(invalid());
        }
        Self::check_client(&grant, client_id)?;

        self.prune_expired_tokens(&grant.user_id, &grant.id).await?;
        let tokens = self.issue_tokens(&mut grant).await?;
        tracing::info!(client_id = %grant.client_id, grant_id = %grant.id, "Refreshed token pair");
        Ok(tokens)
    }

    async fn unwrap_token(&self, bearer: &str) -> ProviderResult<Option<TokenRecord>> {
        let Some((user_id, grant_id)) = Self::parse_credential(bearer) else {
            return Ok(None);
        };

        let key = token_key(user_id, grant_id, &Self::hash(bearer));
        let record: Option<TokenRecord> = kv::get_json(self.kv.as_ref(), &key).await?;

        Ok(record.filter(|r| !r.is_expired_at(Self::now())))
    }
}

#[async_trait::async_trait]
impl GrantStore for KvOAuthProvider {
    async fn list_user_grants(
        &self,
        user_id: &str,
        options: GrantListOptions,
    ) -> StoreResult<ListResult<GrantSummary>> {
        self.grants.list_user_grants(user_id, options).await
    }

    async fn revoke_grant(&self, grant_id: &str, user_id: &str) -> StoreResult<()> {
        self.grants.revoke_grant(grant_id, user_id).await
    }
}

impl std::fmt::Debug for KvOAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvOAuthProvider").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grants::SessionProps;
    use crate::kv::MemoryKv;

    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    fn provider() -> (KvOAuthProvider, Arc<MemoryKv>) {
        let kv = Arc::new(MemoryKv::new());
        let provider = KvOAuthProvider::new(kv.clone(), &Config::for_testing("http://unused"));
        (provider, kv)
    }

    fn authorize_params(client_id: &str) -> AuthorizeParams {
        AuthorizeParams {
            response_type: Some("code".into()),
            client_id: Some(client_id.into()),
            redirect_uri: Some("http://localhost/cb".into()),
            scope: Some("read write".into()),
            state: Some("client-state".into()),
            code_challenge: Some(CHALLENGE.into()),
            code_challenge_method: Some("S256".into()),
        }
    }

    async fn authorized_code(provider: &KvOAuthProvider) -> (String, String) {
        let client = provider
            .register_client(Some("Test".into()), vec!["http://localhost/cb".into()])
            .await
            .unwrap();
        let request = provider.parse_auth_request(&authorize_params(&client.client_id)).await.unwrap();
        let result = provider
            .complete_authorization(CompleteAuthorizationOptions {
                scope: request.scope.clone(),
                request,
                user_id: "user-1".into(),
                metadata: serde_json::json!({}),
                props: SessionProps {
                    access_token: "lin_oauth_abc".into(),
                    email: Some("a@example.com".into()),
                    user_id: Some("user-1".into()),
                },
            })
            .await
            .unwrap();

        let url = url::Url::parse(&result.redirect_to).unwrap();
        let code = url
            .query_pairs()
            .find(|(k, _)| k == "code")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert!(url.query_pairs().any(|(k, v)| k == "state" && v == "client-state"));
        (client.client_id, code)
    }

    #[tokio::test]
    async fn test_parse_rejects_unknown_client() {
        let (provider, _) = provider();
        let err = provider.parse_auth_request(&authorize_params("nope")).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_client");
    }

    #[tokio::test]
    async fn test_parse_rejects_unregistered_redirect() {
        let (provider, _) = provider();
        let client = provider
            .register_client(None, vec!["http://localhost/cb".into()])
            .await
            .unwrap();
        let mut params = authorize_params(&client.client_id);
        params.redirect_uri = Some("http://evil.example/cb".into());

        let err = provider.parse_auth_request(&params).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_request");
    }

    #[tokio::test]
    async fn test_register_requires_redirect_uris() {
        let (provider, _) = provider();
        let err = provider.register_client(None, vec![]).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_client_metadata");
    }

    #[tokio::test]
    async fn test_code_exchange_and_unwrap() {
        let (provider, kv) = provider();
        let (client_id, code) = authorized_code(&provider).await;

        let tokens = provider
            .exchange_authorization_code(&code, Some(&client_id), None, Some(VERIFIER))
            .await
            .unwrap();
        assert_eq!(tokens.scope, "read write");
        assert!(tokens.access_token.starts_with("user-1:"));

        let record = provider.unwrap_token(&tokens.access_token).await.unwrap().unwrap();
        assert_eq!(record.grant.props.access_token, "lin_oauth_abc");
        assert_eq!(record.user_id, "user-1");

        // Only hashes are stored
        for key in kv.keys().await {
            let raw = kv.get(&key).await.unwrap().unwrap();
            assert!(!raw.contains(&tokens.access_token));
            assert!(!raw.contains(&tokens.refresh_token));
        }
    }

    #[tokio::test]
    async fn test_code_is_single_use() {
        let (provider, _) = provider();
        let (client_id, code) = authorized_code(&provider).await;

        provider
            .exchange_authorization_code(&code, Some(&client_id), None, Some(VERIFIER))
            .await
            .unwrap();
        let err = provider
            .exchange_authorization_code(&code, Some(&client_id), None, Some(VERIFIER))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "invalid_grant");
    }

    #[tokio::test]
    async fn test_pkce_mismatch_rejected() {
        let (provider, _) = provider();
        let (client_id, code) = authorized_code(&provider).await;

        let err = provider
            .exchange_authorization_code(&code, Some(&client_id), None, Some("wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "invalid_grant");
    }

    #[tokio::test]
    async fn test_refresh_rotates() {
        let (provider, _) = provider();
        let (client_id, code) = authorized_code(&provider).await;
        let first = provider
            .exchange_authorization_code(&code, Some(&client_id), None, Some(VERIFIER))
            .await
            .unwrap();

        let second = provider.exchange_refresh_token(&first.refresh_token, None).await.unwrap();
        assert_ne!(second.access_token, first.access_token);
        assert!(provider.unwrap_token(&second.access_token).await.unwrap().is_some());

        // The old refresh token was rotated out
        let err = provider.exchange_refresh_token(&first.refresh_token, None).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_grant");
    }

    #[tokio::test]
    async fn test_revoked_grant_tokens_stop_working() {
        let (provider, _) = provider();
        let (client_id, code) = authorized_code(&provider).await;
        let tokens = provider
            .exchange_authorization_code(&code, Some(&client_id), None, Some(VERIFIER))
            .await
            .unwrap();
        let record = provider.unwrap_token(&tokens.access_token).await.unwrap().unwrap();

        provider.revoke_grant(&record.grant_id, "user-1").await.unwrap();

        assert!(provider.unwrap_token(&tokens.access_token).await.unwrap().is_none());
        assert!(provider.exchange_refresh_token(&tokens.refresh_token, None).await.is_err());
    }

    const DAY: i64 = 24 * 3600;

    async fn exchanged(provider: &KvOAuthProvider) -> TokenResponse {
        let (client_id, code) = authorized_code(provider).await;
        provider
            .exchange_authorization_code(&code, Some(&client_id), None, Some(VERIFIER))
            .await
            .unwrap()
    }

    async fn edit_grant(kv: &MemoryKv, tokens: &TokenResponse, edit: impl FnOnce(&mut Grant)) {
        let (user_id, grant_id) = KvOAuthProvider::parse_credential(&tokens.access_token).unwrap();
        let key = grant_key(user_id, grant_id);
        let mut grant: Grant = kv::get_json(kv, &key).await.unwrap().unwrap();
        edit(&mut grant);
        kv::put_json(kv, &key, &grant).await.unwrap();
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_lifetime_starts_at_issue() {
        let (provider, kv) = provider();
        let tokens = exchanged(&provider).await;
        let now = KvOAuthProvider::now();

        // Logged in long ago, refreshed yesterday
        edit_grant(&kv, &tokens, |g| {
            g.created_at = now - 40 * DAY;
            g.refresh_token_issued_at = Some(now - DAY);
        })
        .await;
        let rotated = provider.exchange_refresh_token(&tokens.refresh_token, None).await.unwrap();

        edit_grant(&kv, &rotated, |g| g.refresh_token_issued_at = Some(now - 31 * DAY)).await;
        let err = provider.exchange_refresh_token(&rotated.refresh_token, None).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_grant");
    }

    #[tokio::test]
    async fn test_refresh_prunes_expired_tokens() {
        let (provider, kv) = provider();
        let first = exchanged(&provider).await;

        let (user_id, grant_id) = KvOAuthProvider::parse_credential(&first.access_token).unwrap();
        let prefix = token_prefix(user_id, grant_id);
        let old_key = token_key(user_id, grant_id, &KvOAuthProvider::hash(&first.access_token));
        let mut record: TokenRecord = kv::get_json(kv.as_ref(), &old_key).await.unwrap().unwrap();
        record.expires_at = KvOAuthProvider::now() - 1;
        kv::put_json(kv.as_ref(), &old_key, &record).await.unwrap();

        let second = provider.exchange_refresh_token(&first.refresh_token, None).await.unwrap();
        let third = provider.exchange_refresh_token(&second.refresh_token, None).await.unwrap();

        let tokens: Vec<String> =
            kv.keys().await.into_iter().filter(|k| k.starts_with(&prefix)).collect();
        assert!(!tokens.contains(&old_key));
        // Unexpired tokens survive
        assert_eq!(tokens.len(), 2);
        assert!(provider.unwrap_token(&second.access_token).await.unwrap().is_some());
        assert!(provider.unwrap_token(&third.access_token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unwrap_malformed_token() {
        let (provider, _) = provider();
        assert!(provider.unwrap_token("garbage").await.unwrap().is_none());
        assert!(provider.unwrap_token("a:b:").await.unwrap().is_none());
    }
}
