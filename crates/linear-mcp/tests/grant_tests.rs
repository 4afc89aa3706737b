//! Grant listing, pagination and logout over the in-memory store.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use linear_mcp::client::LinearClient;
use linear_mcp::config::Config;
use linear_mcp::grants::{
    GrantListOptions, GrantStore, KvGrantStore, SessionProps, grant_key, list_user_grants,
    revoke_all_user_grants, token_key,
};
use linear_mcp::kv::{KvStore, MemoryKv};
use linear_mcp::tools::{ToolContext, call_tool, find_tool, register_all_tools};

fn grant_json(user_id: &str, grant_id: &str) -> String {
    json!({
        "id": grant_id,
        "clientId": "client-1",
        "userId": user_id,
        "scope": ["read"],
        "metadata": {},
        "createdAt": 1_700_000_000,
        "props": {"accessToken": "lin_oauth_secret", "userId": user_id}
    })
    .to_string()
}

async fn seed_grants(kv: &MemoryKv, user_id: &str, count: usize, tokens_each: usize) {
    for i in 0..count {
        let grant_id = format!("g{i:05}");
        kv.put(&grant_key(user_id, &grant_id), grant_json(user_id, &grant_id)).await.unwrap();
        for t in 0..tokens_each {
            kv.put(&token_key(user_id, &grant_id, &format!("t{t}")), "{}".into()).await.unwrap();
        }
    }
}

/// Walk every page; returns (pages, ids).
async fn collect_pages(kv: &MemoryKv, user_id: &str, limit: usize) -> (usize, Vec<String>) {
    let mut pages = 0;
    let mut ids = Vec::new();
    let mut cursor = None;
    loop {
        let page = list_user_grants(kv, user_id, GrantListOptions { limit: Some(limit), cursor })
            .await
            .unwrap();
        pages += 1;
        ids.extend(page.items.into_iter().map(|g| g.id));
        match page.cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    (pages, ids)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_pagination_visits_each_grant_once(count in 1usize..120, limit in 1usize..40) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let (pages, ids) = rt.block_on(async {
            let kv = MemoryKv::new();
            seed_grants(&kv, "u1", count, 0).await;
            // Another user's grants must never leak into the listing
            seed_grants(&kv, "u2", 3, 0).await;
            collect_pages(&kv, "u1", limit).await
        });

        prop_assert_eq!(pages, count.div_ceil(limit));
        prop_assert_eq!(ids.len(), count);
        let unique: HashSet<_> = ids.iter().collect();
        prop_assert_eq!(unique.len(), count);
    }
}

#[tokio::test]
async fn test_listing_empty_user_is_single_page() {
    let kv = MemoryKv::new();
    seed_grants(&kv, "u2", 5, 0).await;

    let (pages, ids) = collect_pages(&kv, "u1", 10).await;
    assert_eq!(pages, 1);
    assert!(ids.is_empty());
}

#[tokio::test]
async fn test_summaries_carry_no_secrets() {
    let kv = MemoryKv::new();
    seed_grants(&kv, "u1", 1, 0).await;

    let page = list_user_grants(&kv, "u1", GrantListOptions::default()).await.unwrap();
    let rendered = serde_json::to_string(&page.items).unwrap();
    assert!(!rendered.contains("lin_oauth_secret"));
    assert!(rendered.contains("clientId"));
}

#[tokio::test]
async fn test_revoke_all_crosses_page_boundary() {
    let kv = Arc::new(MemoryKv::new());
    seed_grants(&kv, "u1", 1_205, 2).await;
    seed_grants(&kv, "u2", 2, 1).await;

    let store = KvGrantStore::new(kv.clone());
    let revoked = revoke_all_user_grants(&store, "u1").await.unwrap();

    assert_eq!(revoked, 1_205);
    let remaining = kv.keys().await;
    assert!(remaining.iter().all(|k| k.contains(":u2:")), "{remaining:?}");
    assert_eq!(remaining.len(), 4);

    let page = store.list_user_grants("u1", GrantListOptions::default()).await.unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_logout_tool_reports_count() {
    let kv = Arc::new(MemoryKv::new());
    seed_grants(&kv, "u1", 1_001, 1).await;

    let client = LinearClient::new(&Config::for_testing("http://unused.localhost")).unwrap();
    let props = SessionProps {
        access_token: "lin_oauth_secret".into(),
        email: None,
        user_id: Some("u1".into()),
    };
    let ctx = ToolContext::new(client, Arc::new(KvGrantStore::new(kv.clone())), Some(props));

    let tools = register_all_tools();
    let logout = find_tool(&tools, "logout").unwrap();

    let output = call_tool(logout, &ctx, json!({})).await;
    assert!(!output.is_error);
    assert_eq!(output.text, "Successfully revoked 1001 grant(s).");
    assert!(kv.is_empty().await);

    let output = call_tool(logout, &ctx, json!({})).await;
    assert_eq!(output.text, "No active grants found.");
}

#[tokio::test]
async fn test_logout_without_user_is_error_content() {
    let kv = Arc::new(MemoryKv::new());
    seed_grants(&kv, "u1", 1, 0).await;

    let client = LinearClient::new(&Config::for_testing("http://unused.localhost")).unwrap();
    let ctx = ToolContext::new(
        client,
        Arc::new(KvGrantStore::new(kv.clone())),
        Some(SessionProps::from_access_token("lin_api_key")),
    );

    let tools = register_all_tools();
    let output = call_tool(find_tool(&tools, "logout").unwrap(), &ctx, json!({})).await;

    assert!(output.is_error);
    assert_eq!(output.text, "No user ID found in session");
    assert_eq!(kv.len().await, 1);
}
