use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::session::DebateSession;

/// Per-session lock. The slot is `None` once the session has been evicted,
/// so a caller that fetched the handle earlier can never revive it.
pub type SessionHandle = Arc<Mutex<Option<DebateSession>>>;

/// Keyed session storage with an explicit lock per session.
///
/// Implementations only guard the map itself; all mutation of a session
/// happens under its own [`SessionHandle`] lock, held by the coordinator.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session, returning its handle. Replaces any session
    /// with the same id.
    async fn insert(&self, session: DebateSession) -> SessionHandle;

    async fn get(&self, session_id: &str) -> Option<SessionHandle>;

    async fn remove(&self, session_id: &str) -> Option<SessionHandle>;

    /// Every (id, handle) pair at the time of the call.
    async fn handles(&self) -> Vec<(String, SessionHandle)>;

    async fn len(&self) -> usize;
}

/// Process-lifetime store backed by a `HashMap`.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: DebateSession) -> SessionHandle {
        let id = session.session_id.clone();
        let handle: SessionHandle = Arc::new(Mutex::new(Some(session)));
        self.sessions.write().await.insert(id, Arc::clone(&handle));
        handle
    }

    async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    async fn remove(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.write().await.remove(session_id)
    }

    async fn handles(&self) -> Vec<(String, SessionHandle)> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(id, h)| (id.clone(), Arc::clone(h)))
            .collect()
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
