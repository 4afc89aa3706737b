//! Prefix-addressed key-value store.
//!
//! Grants, tokens and registered clients live in a single namespace, partitioned
//! by key prefix (`grant:`, `token:`, `client:`). Values are JSON text.

mod memory;

pub use memory::MemoryKv;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreResult;

/// Maximum keys returned by a single `list` call.
pub const MAX_LIST_LIMIT: usize = 1000;

/// Options for a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct KvListOptions {
    /// Only keys starting with this prefix are returned.
    pub prefix: String,
    /// Page size, capped at [`MAX_LIST_LIMIT`].
    pub limit: Option<usize>,
    /// Continuation cursor from a previous page.
    pub cursor: Option<String>,
}

impl KvListOptions {
    /// List everything under `prefix`, starting from the first page.
    #[must_use]
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), ..Self::default() }
    }
}

/// A listed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvKey {
    pub name: String,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct KvListPage {
    pub keys: Vec<KvKey>,
    /// Present while `list_complete` is false.
    pub cursor: Option<String>,
    pub list_complete: bool,
}

/// Key-value backend.
///
/// `delete` of a missing key succeeds; callers rely on that for idempotent revocation.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    /// List keys in lexicographic order.
    async fn list(&self, options: KvListOptions) -> StoreResult<KvListPage>;

    /// Fetch the raw value stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: String) -> StoreResult<()>;

    /// Remove `key`.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Fetch and deserialize a JSON value.
pub async fn get_json<T: DeserializeOwned>(kv: &dyn KvStore, key: &str) -> StoreResult<Option<T>> {
    match kv.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize and store a JSON value.
pub async fn put_json<T: Serialize + Sync>(kv: &dyn KvStore, key: &str, value: &T) -> StoreResult<()> {
    let raw = serde_json::to_string(value)?;
    kv.put(key, raw).await
}
