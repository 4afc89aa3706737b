//! In-memory key-value store following the `SessionManager` pattern.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tokio::sync::RwLock;

use super::{KvKey, KvListOptions, KvListPage, KvStore, MAX_LIST_LIMIT};
use crate::error::{StoreError, StoreResult};

/// Ordered in-memory store.
///
/// Cursors encode the last key of the previous page, so a page resumes strictly
/// after it even when earlier keys were deleted in between.
#[derive(Clone, Default)]
pub struct MemoryKv {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryKv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Snapshot of all keys, in order.
    pub async fn keys(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    fn encode_cursor(key: &str) -> String {
        URL_SAFE_NO_PAD.encode(key.as_bytes())
    }

    fn decode_cursor(cursor: &str) -> StoreResult<String> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|e| StoreError::InvalidCursor(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| StoreError::InvalidCursor(e.to_string()))
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryKv {
    async fn list(&self, options: KvListOptions) -> StoreResult<KvListPage> {
        let limit = options.limit.unwrap_or(MAX_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

        let lower = match options.cursor.as_deref() {
            Some(cursor) => Bound::Excluded(Self::decode_cursor(cursor)?),
            None => Bound::Included(options.prefix.clone()),
        };

        let entries = self.entries.read().await;
        let mut matched = entries
            .range((lower, Bound::Unbounded))
            .map(|(k, _)| k)
            .skip_while(|k| k.as_str() < options.prefix.as_str())
            .take_while(|k| k.starts_with(&options.prefix));

        let keys: Vec<KvKey> =
            matched.by_ref().take(limit).map(|name| KvKey { name: name.clone() }).collect();
        let list_complete = matched.next().is_none();

        let cursor = if list_complete {
            None
        } else {
            keys.last().map(|k| Self::encode_cursor(&k.name))
        };

        Ok(KvListPage { keys, cursor, list_complete })
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> StoreResult<()> {
        self.entries.write().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKv").finish()
    }
}
