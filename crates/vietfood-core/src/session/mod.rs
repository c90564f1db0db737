//! Per-user conversation sessions
//!
//! A session owns one [`ChatSession`] behind an async mutex. That mutex is
//! the turn lock: a turn holds it from the first model call until the
//! assistant reply is recorded, and the reaper holds it from idle check
//! through removal. A session removed by the reaper is flagged evicted
//! before it leaves the store, so anyone still holding the handle can tell.

mod prompt;
mod registry;

pub use prompt::{build_system_instruction, SessionSnapshot};
pub use registry::SessionRegistry;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;
use vietfood_llm::ChatSession;

/// Caller-supplied identity of the customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    /// Stable user id
    pub id: String,
    /// Name used to address the customer
    pub display_name: String,
}

impl UserIdentity {
    /// Create an identity
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// One live conversation
pub struct Session {
    id: Uuid,
    user_id: String,
    created_at: DateTime<Utc>,
    last_accessed_ms: AtomicI64,
    evicted: AtomicBool,
    chat: Arc<Mutex<ChatSession>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("created_at", &self.created_at)
            .field("last_accessed_ms", &self.last_accessed_millis())
            .field("evicted", &self.is_evicted())
            .finish()
    }
}

impl Session {
    /// Wrap a freshly opened chat
    #[must_use]
    pub fn new(user_id: impl Into<String>, chat: ChatSession, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            created_at,
            last_accessed_ms: AtomicI64::new(created_at.timestamp_millis()),
            evicted: AtomicBool::new(false),
            chat: Arc::new(Mutex::new(chat)),
        }
    }

    /// Session id
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Owner
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Creation time
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last successful turn (or creation), in epoch milliseconds
    #[must_use]
    pub fn last_accessed_millis(&self) -> i64 {
        self.last_accessed_ms.load(Ordering::SeqCst)
    }

    /// Record activity; never moves the timestamp backwards
    pub fn touch(&self, now_ms: i64) {
        self.last_accessed_ms.fetch_max(now_ms, Ordering::SeqCst);
    }

    /// Whether the reaper has retired this session
    #[must_use]
    pub fn is_evicted(&self) -> bool {
        self.evicted.load(Ordering::SeqCst)
    }

    /// Retire the session; call while holding the turn lock
    pub fn mark_evicted(&self) {
        self.evicted.store(true, Ordering::SeqCst);
    }

    /// The turn lock and chat handle
    #[must_use]
    pub fn chat(&self) -> Arc<Mutex<ChatSession>> {
        Arc::clone(&self.chat)
    }
}

/// Storage for live sessions, keyed by user id
pub trait SessionStore: Send + Sync {
    /// Live session of a user
    fn get(&self, user_id: &str) -> Option<Arc<Session>>;

    /// Register `session` unless a live one exists; returns whichever is live
    fn insert_if_absent(&self, session: Arc<Session>) -> Arc<Session>;

    /// Remove exactly this instance; false if the slot holds another one
    fn remove_if_same(&self, session: &Arc<Session>) -> bool;

    /// All registered sessions
    fn snapshot(&self) -> Vec<Arc<Session>>;

    /// Number of registered sessions
    fn len(&self) -> usize;

    /// Whether no session is registered
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every session, returning them
    fn drain(&self) -> Vec<Arc<Session>>;
}

/// Sessions in a concurrent map
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Arc<Session>>,
}

impl InMemorySessionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, user_id: &str) -> Option<Arc<Session>> {
        self.sessions
            .get(user_id)
            .map(|s| Arc::clone(s.value()))
            .filter(|s| !s.is_evicted())
    }

    fn insert_if_absent(&self, session: Arc<Session>) -> Arc<Session> {
        match self.sessions.entry(session.user_id().to_string()) {
            Entry::Occupied(mut slot) => {
                if slot.get().is_evicted() {
                    slot.insert(Arc::clone(&session));
                    session
                } else {
                    Arc::clone(slot.get())
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&session));
                session
            }
        }
    }

    fn remove_if_same(&self, session: &Arc<Session>) -> bool {
        self.sessions
            .remove_if(session.user_id(), |_, current| Arc::ptr_eq(current, session))
            .is_some()
    }

    fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|s| Arc::clone(s.value())).collect()
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }

    fn drain(&self) -> Vec<Arc<Session>> {
        let keys: Vec<String> = self.sessions.iter().map(|s| s.key().clone()).collect();
        keys.into_iter()
            .filter_map(|k| self.sessions.remove(&k).map(|(_, s)| s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vietfood_llm::{ChatConfig, MockProvider};

    fn session(user_id: &str) -> Arc<Session> {
        let chat = ChatSession::new(
            Arc::new(MockProvider::new()),
            "system",
            Vec::new(),
            ChatConfig::default(),
        );
        Arc::new(Session::new(user_id, chat, Utc::now()))
    }

    #[test]
    fn test_insert_if_absent_keeps_live_session() {
        let store = InMemorySessionStore::new();
        let first = session("u1");
        let second = session("u1");

        assert!(Arc::ptr_eq(&store.insert_if_absent(Arc::clone(&first)), &first));
        assert!(Arc::ptr_eq(&store.insert_if_absent(second), &first));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_evicted_session_is_replaced() {
        let store = InMemorySessionStore::new();
        let old = session("u1");
        store.insert_if_absent(Arc::clone(&old));
        old.mark_evicted();
        assert!(store.get("u1").is_none());

        let fresh = session("u1");
        assert!(Arc::ptr_eq(&store.insert_if_absent(Arc::clone(&fresh)), &fresh));
        assert!(!store.remove_if_same(&old));
        assert!(store.remove_if_same(&fresh));
        assert!(store.is_empty());
    }

    #[test]
    fn test_touch_is_monotonic() {
        let s = session("u1");
        let start = s.last_accessed_millis();
        s.touch(start + 5_000);
        s.touch(start + 1_000);
        assert_eq!(s.last_accessed_millis(), start + 5_000);
    }

    #[test]
    fn test_drain() {
        let store = InMemorySessionStore::new();
        store.insert_if_absent(session("u1"));
        store.insert_if_absent(session("u2"));
        assert_eq!(store.drain().len(), 2);
        assert!(store.is_empty());
    }
}
