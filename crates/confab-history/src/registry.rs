//! Session registry: the shared `UserId -> Session` map.
//!
//! Sessions are created lazily and never destroyed. Each entry carries
//! two locks: an async mutex over the session state (held per history
//! operation) and a separate per-user reply gate (held by the reply
//! cycle across its read-modify-append span). Keeping them distinct
//! means a completer that re-enters the history store while the gate
//! is held cannot deadlock.

use crate::session::Session;
use confab_types::UserId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

/// Per-user entry: session state plus the reply serialization gate.
pub struct SessionEntry {
    state: AsyncMutex<Session>,
    reply_gate: AsyncMutex<()>,
}

impl SessionEntry {
    fn new(session: Session) -> Self {
        Self {
            state: AsyncMutex::new(session),
            reply_gate: AsyncMutex::new(()),
        }
    }

    /// Lock the session state for one history operation.
    pub async fn state(&self) -> MutexGuard<'_, Session> {
        self.state.lock().await
    }

    /// Acquire the per-user reply gate, serializing whole reply cycles.
    pub async fn reply_guard(&self) -> MutexGuard<'_, ()> {
        self.reply_gate.lock().await
    }
}

/// Shared map of live sessions with per-entry locking.
///
/// The map lock is held only for lookup and insertion, never across an
/// await point; unrelated users never contend.
#[derive(Default)]
pub struct SessionRegistry {
    entries: Mutex<HashMap<UserId, Arc<SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an existing entry without creating one.
    pub fn get(&self, user: UserId) -> Option<Arc<SessionEntry>> {
        self.lock_map().get(&user).cloned()
    }

    /// Return the entry for `user`, creating it from `make_session` if
    /// absent. On a creation race the first insert wins and the other
    /// session is dropped.
    pub fn get_or_insert_with(
        &self,
        user: UserId,
        make_session: impl FnOnce() -> Session,
    ) -> Arc<SessionEntry> {
        let mut map = self.lock_map();
        map.entry(user)
            .or_insert_with(|| Arc::new(SessionEntry::new(make_session())))
            .clone()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.lock_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_map().is_empty()
    }

    fn lock_map(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, Arc<SessionEntry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(user: UserId) -> Session {
        Session::new(user, 10, None)
    }

    #[test]
    fn lazy_creation() {
        let registry = SessionRegistry::new();
        assert!(registry.get(UserId(1)).is_none());
        registry.get_or_insert_with(UserId(1), || make(UserId(1)));
        assert!(registry.get(UserId(1)).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn same_user_gets_same_entry() {
        let registry = SessionRegistry::new();
        let a = registry.get_or_insert_with(UserId(1), || make(UserId(1)));
        let b = registry.get_or_insert_with(UserId(1), || make(UserId(1)));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_users_get_distinct_entries() {
        let registry = SessionRegistry::new();
        let a = registry.get_or_insert_with(UserId(1), || make(UserId(1)));
        let b = registry.get_or_insert_with(UserId(2), || make(UserId(2)));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn state_and_gate_are_independent_locks() {
        let registry = SessionRegistry::new();
        let entry = registry.get_or_insert_with(UserId(1), || make(UserId(1)));
        let _gate = entry.reply_guard().await;
        // State must still be lockable while the gate is held.
        let state = entry.state().await;
        assert_eq!(state.user_id(), UserId(1));
    }

    #[tokio::test]
    async fn entries_serialize_state_access() {
        use confab_types::Role;
        let registry = Arc::new(SessionRegistry::new());
        let entry = registry.get_or_insert_with(UserId(1), || make(UserId(1)));

        let mut handles = Vec::new();
        for i in 0..8 {
            let entry = entry.clone();
            handles.push(tokio::spawn(async move {
                let mut session = entry.state().await;
                session.push(Role::User, format!("msg {i}"));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let session = entry.state().await;
        assert_eq!(session.len(), 8);
        let seqs: Vec<u64> = session.turns().iter().map(|t| t.sequence).collect();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    }
}
