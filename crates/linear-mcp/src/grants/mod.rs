//! Grant lifecycle: listing and revoking a user's delegated-access grants.
//!
//! Grants live under `grant:{userId}:{grantId}` and every token derived from a
//! grant lives under `token:{userId}:{grantId}:{tokenId}`. Revocation removes
//! the tokens first and the grant record last, so a crash half-way leaves a
//! grant with fewer (or zero) tokens, which can simply be revoked again.

mod types;

pub use types::{
    Grant, GrantListOptions, GrantSummary, ListResult, SessionProps, TokenGrant, TokenRecord,
    grant_key, grant_prefix, token_key, token_prefix,
};

use std::sync::Arc;

use futures::future::try_join_all;

use crate::error::StoreResult;
use crate::kv::{KvListOptions, KvStore};

/// Grant management primitives.
///
/// The OAuth provider exposes these natively; [`KvGrantStore`] implements them
/// directly over the key-value namespace.
#[async_trait::async_trait]
pub trait GrantStore: Send + Sync {
    /// List one page of a user's grants.
    async fn list_user_grants(
        &self,
        user_id: &str,
        options: GrantListOptions,
    ) -> StoreResult<ListResult<GrantSummary>>;

    /// Delete a grant and every token derived from it.
    async fn revoke_grant(&self, grant_id: &str, user_id: &str) -> StoreResult<()>;
}

/// [`GrantStore`] backed by a [`KvStore`].
#[derive(Clone)]
pub struct KvGrantStore {
    kv: Arc<dyn KvStore>,
}

impl KvGrantStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }
}

#[async_trait::async_trait]
impl GrantStore for KvGrantStore {
    async fn list_user_grants(
        &self,
        user_id: &str,
        options: GrantListOptions,
    ) -> StoreResult<ListResult<GrantSummary>> {
        list_user_grants(self.kv.as_ref(), user_id, options).await
    }

    async fn revoke_grant(&self, grant_id: &str, user_id: &str) -> StoreResult<()> {
        revoke_grant(self.kv.as_ref(), grant_id, user_id).await
    }
}

impl std::fmt::Debug for KvGrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvGrantStore").finish()
    }
}

/// List a user's grants as public summaries.
///
/// Records are fetched concurrently. A missing or unparsable record is skipped
/// rather than failing the page. The cursor is only returned while the
/// underlying listing is incomplete; a page may be empty and still carry one.
pub async fn list_user_grants(
    kv: &dyn KvStore,
    user_id: &str,
    options: GrantListOptions,
) -> StoreResult<ListResult<GrantSummary>> {
    let page = kv
        .list(KvListOptions {
            prefix: grant_prefix(user_id),
            limit: options.limit,
            cursor: options.cursor,
        })
        .await?;

    let records = try_join_all(page.keys.iter().map(|key| kv.get(&key.name))).await?;

    let items = page
        .keys
        .iter()
        .zip(records)
        .filter_map(|(key, raw)| {
            let raw = raw?;
            match serde_json::from_str::<Grant>(&raw) {
                Ok(grant) => Some(grant.summary()),
                Err(e) => {
                    tracing::warn!(key = %key.name, error = %e, "Skipping unreadable grant record");
                    None
                }
            }
        })
        .collect();

    Ok(ListResult {
        items,
        cursor: if page.list_complete { None } else { page.cursor },
    })
}

/// Revoke a grant: delete all of its tokens page by page, then the grant itself.
///
/// Each page's deletes run concurrently and must all finish before the next
/// page is listed. Deleting keys that are already gone is a no-op, so the
/// operation can be re-run after a partial failure.
pub async fn revoke_grant(kv: &dyn KvStore, grant_id: &str, user_id: &str) -> StoreResult<()> {
    let prefix = token_prefix(user_id, grant_id);
    let mut cursor: Option<String> = None;
    let mut deleted = 0usize;

    loop {
        let page = kv
            .list(KvListOptions { prefix: prefix.clone(), limit: None, cursor: cursor.take() })
            .await?;

        if !page.keys.is_empty() {
            try_join_all(page.keys.iter().map(|key| kv.delete(&key.name))).await?;
            deleted += page.keys.len();
        }

        if page.list_complete {
            break;
        }
        cursor = page.cursor;
    }

    kv.delete(&grant_key(user_id, grant_id)).await?;

    tracing::info!(user_id = %user_id, grant_id = %grant_id, tokens = deleted, "Revoked grant");
    Ok(())
}

/// Revoke every grant a user holds, following cursors until the listing ends.
///
/// All pages are collected before the first revocation so deletions cannot
/// disturb the listing. Revocations run one grant at a time.
pub async fn revoke_all_user_grants(store: &dyn GrantStore, user_id: &str) -> StoreResult<usize> {
    let mut grants = Vec::new();
    let mut cursor = None;

    loop {
        let page = store
            .list_user_grants(user_id, GrantListOptions { limit: None, cursor: cursor.take() })
            .await?;
        grants.extend(page.items);
        match page.cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    for grant in &grants {
        store.revoke_grant(&grant.id, user_id).await?;
    }

    Ok(grants.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::kv::{KvListPage, MemoryKv};

    fn grant_json(user_id: &str, grant_id: &str) -> String {
        serde_json::json!({
            "id": grant_id,
            "clientId": "client-1",
            "userId": user_id,
            "scope": ["read", "write"],
            "metadata": {},
            "createdAt": 1_700_000_000,
            "props": {"accessToken": "secret", "email": "a@example.com", "userId": user_id}
        })
        .to_string()
    }

    async fn seed(kv: &MemoryKv, keys: &[&str]) {
        for key in keys {
            let parts: Vec<&str> = key.split(':').collect();
            let value = if parts[0] == "grant" {
                grant_json(parts[1], parts[2])
            } else {
                "{}".to_string()
            };
            kv.put(key, value).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_revoke_grant_leaves_other_grants() {
        let kv = MemoryKv::new();
        seed(
            &kv,
            &["token:u1:g1:a", "token:u1:g1:b", "token:u1:g2:c", "grant:u1:g1", "grant:u1:g2"],
        )
        .await;

        revoke_grant(&kv, "g1", "u1").await.unwrap();

        assert_eq!(kv.keys().await, vec!["grant:u1:g2".to_string(), "token:u1:g2:c".to_string()]);
    }

    #[tokio::test]
    async fn test_revoke_grant_is_idempotent() {
        let kv = MemoryKv::new();
        seed(&kv, &["token:u1:g1:a", "grant:u1:g1"]).await;

        revoke_grant(&kv, "g1", "u1").await.unwrap();
        revoke_grant(&kv, "g1", "u1").await.unwrap();

        assert!(kv.is_empty().await);
    }

    #[tokio::test]
    async fn test_revoke_grant_pages_through_many_tokens() {
        let kv = MemoryKv::new();
        for i in 0..2_500 {
            kv.put(&format!("token:u1:g1:{i:05}"), "{}".into()).await.unwrap();
        }
        seed(&kv, &["grant:u1:g1"]).await;

        revoke_grant(&kv, "g1", "u1").await.unwrap();

        assert!(kv.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_records() {
        let kv = MemoryKv::new();
        seed(&kv, &["grant:u1:g1"]).await;
        kv.put("grant:u1:g2", "not json".into()).await.unwrap();

        let result = list_user_grants(&kv, "u1", GrantListOptions::default()).await.unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].id, "g1");
        assert!(result.cursor.is_none());
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_user() {
        let kv = MemoryKv::new();
        seed(&kv, &["grant:u1:g1", "grant:u10:g9", "grant:u2:g3"]).await;

        let result = list_user_grants(&kv, "u1", GrantListOptions::default()).await.unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].user_id, "u1");
    }

    #[tokio::test]
    async fn test_revoke_all_follows_cursor() {
        let kv = Arc::new(MemoryKv::new());
        for i in 0..1_205 {
            kv.put(&format!("grant:u1:g{i:05}"), grant_json("u1", &format!("g{i:05}")))
                .await
                .unwrap();
            kv.put(&format!("token:u1:g{i:05}:t"), "{}".into()).await.unwrap();
        }
        seed(&kv, &["grant:u2:keep"]).await;

        let store = KvGrantStore::new(kv.clone());
        let revoked = revoke_all_user_grants(&store, "u1").await.unwrap();

        assert_eq!(revoked, 1_205);
        assert_eq!(kv.keys().await, vec!["grant:u2:keep".to_string()]);
    }

    /// Store whose `list` always fails.
    struct BrokenKv;

    #[async_trait::async_trait]
    impl KvStore for BrokenKv {
        async fn list(&self, _options: KvListOptions) -> StoreResult<KvListPage> {
            Err(StoreError::backend("list unavailable"))
        }
        async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Ok(None)
        }
        async fn put(&self, _key: &str, _value: String) -> StoreResult<()> {
            Ok(())
        }
        async fn delete(&self, _key: &str) -> StoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let err = list_user_grants(&BrokenKv, "u1", GrantListOptions::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));

        let err = revoke_grant(&BrokenKv, "g1", "u1").await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
