//! Session manager: issues session ids and tracks each session's continuation handle.
//!
//! Backed by a `DashMap`; id registration goes through the vacant-entry API so the
//! collision check and the insert happen under the same shard lock.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FormError, FormResult};

/// Opaque session identifier (UUID v4 text by default).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Draws a fresh random 128-bit id.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Token returned by the generation collaborator that chains a new request onto a prior
/// exchange. Belongs to exactly one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHandle(String);

impl ConversationHandle {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session lifecycle storage. Implementations must make id registration and continuation
/// updates atomic per id.
pub trait SessionStore: Send + Sync {
    /// Registers and returns an id that no live session currently holds.
    fn create_session(&self) -> SessionId;

    fn exists(&self, id: &SessionId) -> bool;

    fn get_continuation(&self, id: &SessionId) -> FormResult<Option<ConversationHandle>>;

    /// Replaces the stored handle. Only the latest handle is retained.
    fn set_continuation(&self, id: &SessionId, handle: ConversationHandle) -> FormResult<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every session. Tests only; the gateway never tears sessions down.
    fn clear(&self);
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    continuation: Option<ConversationHandle>,
}

type IdSource = Box<dyn Fn() -> SessionId + Send + Sync>;

/// In-process session store. Volatile: state lives as long as the process.
pub struct InMemorySessionStore {
    sessions: DashMap<SessionId, SessionState>,
    id_source: IdSource,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::with_id_source(SessionId::random)
    }

    /// Uses a custom id generator (deterministic ids in tests).
    pub fn with_id_source<F>(source: F) -> Self
    where
        F: Fn() -> SessionId + Send + Sync + 'static,
    {
        Self {
            sessions: DashMap::new(),
            id_source: Box::new(source),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn create_session(&self) -> SessionId {
        loop {
            let candidate = (self.id_source)();
            match self.sessions.entry(candidate) {
                Entry::Vacant(slot) => {
                    let id = slot.key().clone();
                    slot.insert(SessionState::default());
                    tracing::debug!(session_id = %id, "session created");
                    return id;
                }
                Entry::Occupied(taken) => {
                    tracing::debug!(session_id = %taken.key(), "session id collision, redrawing");
                }
            }
        }
    }

    fn exists(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    fn get_continuation(&self, id: &SessionId) -> FormResult<Option<ConversationHandle>> {
        self.sessions
            .get(id)
            .map(|s| s.continuation.clone())
            .ok_or_else(|| FormError::SessionNotFound(id.clone()))
    }

    fn set_continuation(&self, id: &SessionId, handle: ConversationHandle) -> FormResult<()> {
        let mut state = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| FormError::SessionNotFound(id.clone()))?;
        state.continuation = Some(handle);
        Ok(())
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }

    fn clear(&self) {
        self.sessions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashSet, VecDeque};
    use std::sync::{Arc, Mutex};

    #[test]
    fn created_id_absent_before_present_after() {
        let store = InMemorySessionStore::new();
        let before = store.len();
        let id = store.create_session();
        assert!(store.exists(&id));
        assert_eq!(store.len(), before + 1);
        assert_ne!(store.create_session(), id);
    }

    #[test]
    fn collision_is_redrawn() {
        let queue = Arc::new(Mutex::new(VecDeque::from(vec!["a", "a", "a", "b"])));
        let q = Arc::clone(&queue);
        let store = InMemorySessionStore::with_id_source(move || {
            SessionId::from(q.lock().unwrap().pop_front().unwrap_or("z"))
        });
        assert_eq!(store.create_session().as_str(), "a");
        assert_eq!(store.create_session().as_str(), "b");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn new_session_has_no_continuation() {
        let store = InMemorySessionStore::new();
        let id = store.create_session();
        assert_eq!(store.get_continuation(&id).unwrap(), None);
    }

    #[test]
    fn continuation_is_replaced_not_accumulated() {
        let store = InMemorySessionStore::new();
        let id = store.create_session();
        store.set_continuation(&id, ConversationHandle::new("resp_1")).unwrap();
        store.set_continuation(&id, ConversationHandle::new("resp_2")).unwrap();
        assert_eq!(
            store.get_continuation(&id).unwrap(),
            Some(ConversationHandle::new("resp_2"))
        );
    }

    #[test]
    fn unknown_session_fails() {
        let store = InMemorySessionStore::new();
        let ghost = SessionId::from("ghost");
        assert!(!store.exists(&ghost));
        assert_eq!(
            store.get_continuation(&ghost).unwrap_err(),
            FormError::SessionNotFound(ghost.clone())
        );
        assert_eq!(
            store
                .set_continuation(&ghost, ConversationHandle::new("h"))
                .unwrap_err(),
            FormError::SessionNotFound(ghost)
        );
    }

    #[test]
    fn continuations_are_per_session() {
        let store = InMemorySessionStore::new();
        let a = store.create_session();
        let b = store.create_session();
        store.set_continuation(&a, ConversationHandle::new("only_a")).unwrap();
        assert_eq!(store.get_continuation(&b).unwrap(), None);
    }

    #[test]
    fn concurrent_creation_yields_unique_ids() {
        let store = Arc::new(InMemorySessionStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&store);
                std::thread::spawn(move || (0..250).map(|_| s.create_session()).collect::<Vec<_>>())
            })
            .collect();
        let mut seen = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(store.len(), 2000);
    }

    #[test]
    fn clear_drops_everything() {
        let store = InMemorySessionStore::new();
        let id = store.create_session();
        store.clear();
        assert!(store.is_empty());
        assert!(!store.exists(&id));
    }
}
