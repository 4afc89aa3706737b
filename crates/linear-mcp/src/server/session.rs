//! MCP session mailboxes.
//!
//! Each session keeps a ring buffer of recent events for `Last-Event-ID`
//! replay plus a broadcast channel for live delivery. A session belongs to the
//! user whose bearer token opened it and is never handed to anyone else.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::response::sse::Event;
use tokio::sync::{RwLock, broadcast};

/// Maximum number of events to keep in history per session.
const HISTORY_SIZE: usize = 100;

/// Session timeout after which sessions are cleaned up.
const SESSION_TIMEOUT: Duration = Duration::from_secs(3600);

/// Cleanup interval for stale sessions.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// A buffered SSE event with ID for replay support.
#[derive(Clone, Debug)]
pub struct BufferedEvent {
    /// Monotonically increasing per session.
    pub id: u64,
    /// Event type (e.g., "message", "endpoint").
    pub event_type: String,
    /// JSON payload.
    pub data: String,
}

impl BufferedEvent {
    pub fn new(id: u64, event_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self { id, event_type: event_type.into(), data: data.into() }
    }

    /// Convert to an Axum SSE Event.
    pub fn to_sse_event(&self) -> Event {
        Event::default().id(self.id.to_string()).event(self.event_type.clone()).data(self.data.clone())
    }
}

/// A single MCP session with message buffer and broadcast channel.
pub struct Session {
    pub id: String,
    /// Linear user id of the session's owner; `None` for anonymous sessions.
    pub owner: Option<String>,
    tx: broadcast::Sender<BufferedEvent>,
    history: RwLock<VecDeque<BufferedEvent>>,
    next_event_id: AtomicU64,
    last_active: RwLock<Instant>,
}

impl Session {
    pub fn new(id: String, owner: Option<String>) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            id,
            owner,
            tx,
            history: RwLock::new(VecDeque::with_capacity(HISTORY_SIZE)),
            next_event_id: AtomicU64::new(1),
            last_active: RwLock::new(Instant::now()),
        }
    }

    /// Push an event to the session (stores in history and broadcasts).
    pub async fn push_event(&self, event_type: impl Into<String>, data: impl Into<String>) -> u64 {
        let id = self.next_event_id.fetch_add(1, Ordering::SeqCst);
        let event = BufferedEvent::new(id, event_type, data);

        {
            let mut history = self.history.write().await;
            if history.len() >= HISTORY_SIZE {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        // No subscribers is fine; the event stays in history
        let _ = self.tx.send(event);

        self.touch().await;
        id
    }

    /// Get events after a given ID (for replay on reconnection).
    pub async fn get_events_after(&self, last_event_id: u64) -> Vec<BufferedEvent> {
        let history = self.history.read().await;
        history.iter().filter(|e| e.id > last_event_id).cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BufferedEvent> {
        self.tx.subscribe()
    }

    pub async fn is_stale(&self) -> bool {
        self.last_active.read().await.elapsed() > SESSION_TIMEOUT
    }

    pub async fn touch(&self) {
        *self.last_active.write().await = Instant::now();
    }

    /// Whether `user_id` may use this session.
    #[must_use]
    pub fn is_owned_by(&self, user_id: Option<&str>) -> bool {
        self.owner.as_deref() == user_id
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("next_event_id", &self.next_event_id.load(Ordering::SeqCst))
            .finish()
    }
}

/// Registry of live sessions.
#[derive(Clone, Default)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new session owned by `owner`.
    pub async fn create_session(&self, owner: Option<&str>) -> Arc<Session> {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(id.clone(), owner.map(str::to_owned)));

        self.sessions.write().await.insert(id, Arc::clone(&session));

        tracing::info!(session_id = %session.id, owner = ?session.owner, "Created new session");
        session
    }

    pub async fn get_session(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Reuse the session `id` if `owner` owns it, otherwise open a new one.
    pub async fn get_or_create_session(&self, id: Option<&str>, owner: Option<&str>) -> Arc<Session> {
        if let Some(session) = match id {
            Some(id) => self.get_session(id).await,
            None => None,
        } {
            if session.is_owned_by(owner) {
                session.touch().await;
                return session;
            }
            tracing::warn!(session_id = %session.id, "Session requested by a different user");
        }
        self.create_session(owner).await
    }

    pub async fn remove_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Removed session");
        }
        removed
    }

    /// Clean up stale sessions.
    pub async fn cleanup_stale_sessions(&self) -> usize {
        let mut to_remove = Vec::new();

        {
            let sessions = self.sessions.read().await;
            for (id, session) in sessions.iter() {
                if session.is_stale().await {
                    to_remove.push(id.clone());
                }
            }
        }

        let count = to_remove.len();
        if count > 0 {
            let mut sessions = self.sessions.write().await;
            for id in to_remove {
                sessions.remove(&id);
                tracing::info!(session_id = %id, "Cleaned up stale session");
            }
        }

        count
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Start background cleanup task.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                let cleaned = self.cleanup_stale_sessions().await;
                if cleaned > 0 {
                    tracing::debug!(count = cleaned, "Session cleanup completed");
                }
            }
        });
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_push_and_replay() {
        let session = Session::new("test".to_string(), None);

        for n in 1..=3 {
            assert_eq!(session.push_event("message", format!(r#"{{"n": {n}}}"#)).await, n);
        }

        let events = session.get_events_after(1).await;
        assert_eq!(events.iter().map(|e| e.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_ring_buffer_overflow() {
        let session = Session::new("test".to_string(), None);
        for i in 0..150 {
            session.push_event("message", format!(r#"{{"n": {i}}}"#)).await;
        }

        let events = session.get_events_after(0).await;
        assert_eq!(events.len(), HISTORY_SIZE);
        assert_eq!(events[0].id, 51);
    }

    #[tokio::test]
    async fn test_session_reused_by_owner() {
        let manager = SessionManager::new();
        let session = manager.create_session(Some("u1")).await;

        let again = manager.get_or_create_session(Some(&session.id), Some("u1")).await;
        assert_eq!(again.id, session.id);
        assert_eq!(manager.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_session_not_shared_across_users() {
        let manager = SessionManager::new();
        let session = manager.create_session(Some("u1")).await;

        let other = manager.get_or_create_session(Some(&session.id), Some("u2")).await;
        assert_ne!(other.id, session.id);
        assert_eq!(other.owner.as_deref(), Some("u2"));
    }

    #[tokio::test]
    async fn test_unknown_session_creates_new() {
        let manager = SessionManager::new();
        let session = manager.get_or_create_session(Some("nonexistent"), None).await;
        assert_ne!(session.id, "nonexistent");
        assert!(manager.remove_session(&session.id).await);
        assert_eq!(manager.session_count().await, 0);
    }
}
