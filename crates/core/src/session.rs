//! Session store: one conversation history per session id.
//!
//! Each session sits behind its own `tokio::sync::Mutex`: the task running a
//! turn holds the lock for the whole turn, so concurrent requests for the
//! same session queue instead of interleaving.

use crate::message::{Conversation, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Shared handle to one session's history.
pub type SessionHandle = Arc<Mutex<Conversation>>;

pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Get the session for `id`, creating it with `system_prompt` as its
    /// first message when it does not exist yet. At capacity, the session
    /// created earliest is evicted first, skipping sessions whose handles are
    /// still held by a request.
    pub async fn open_or_create(&self, id: &SessionId, system_prompt: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(id) {
            return handle.clone();
        }

        let mut sessions = self.sessions.write().await;
        // Another task may have created it between the two locks
        if let Some(handle) = sessions.get(id) {
            return handle.clone();
        }

        if sessions.len() >= self.max_sessions {
            let mut oldest: Option<(SessionId, chrono::DateTime<chrono::Utc>)> = None;
            for (key, handle) in sessions.iter() {
                // A handle held outside the map belongs to a request in flight
                if Arc::strong_count(handle) > 1 {
                    continue;
                }
                let Ok(conv) = handle.try_lock() else { continue };
                if oldest.as_ref().is_none_or(|(_, at)| conv.created_at < *at) {
                    oldest = Some((key.clone(), conv.created_at));
                }
            }
            if let Some((key, _)) = oldest {
                tracing::debug!(session = %key, "Evicting oldest session");
                sessions.remove(&key);
            }
        }

        let handle = Arc::new(Mutex::new(Conversation::start(id.clone(), system_prompt)));
        sessions.insert(id.clone(), handle.clone());
        handle
    }

    pub async fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Copy of a session's history. Waits for any running turn to finish.
    pub async fn snapshot(&self, id: &SessionId) -> Option<Conversation> {
        let handle = self.get(id).await?;
        let conv = handle.lock().await;
        Some(conv.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(1000)
    }
}
