//! The history store: capped turn record per user, durable mirror,
//! degraded-mode absorption of store faults.

use crate::registry::{SessionEntry, SessionRegistry};
use crate::session::{Session, SessionSnapshot};
use crate::store::TurnStore;
use confab_types::{Role, Turn, UserId};
use std::sync::Arc;

/// Retention knobs for the history store.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum turns retained in the in-memory session.
    pub memory_cap: usize,
    /// Rows kept per user in the durable store.
    pub durable_cap: usize,
    /// Optional system turn seeded into every session.
    pub system_prompt: Option<String>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            memory_cap: 20,
            durable_cap: 50,
            system_prompt: None,
        }
    }
}

/// Owns per-user session state and its retention-cap invariant.
///
/// Durable writes are best-effort: a failing [`TurnStore`] is logged
/// and the conversation continues against the in-memory session for
/// the duration of the outage. Nothing on the reply path ever sees a
/// store error.
pub struct HistoryStore {
    registry: Arc<SessionRegistry>,
    durable: Option<Arc<dyn TurnStore>>,
    config: HistoryConfig,
}

impl HistoryStore {
    /// Memory-only store.
    pub fn new(registry: Arc<SessionRegistry>, config: HistoryConfig) -> Self {
        Self {
            registry,
            durable: None,
            config,
        }
    }

    /// Store with a durable mirror.
    pub fn with_durable(
        registry: Arc<SessionRegistry>,
        config: HistoryConfig,
        store: Arc<dyn TurnStore>,
    ) -> Self {
        Self {
            registry,
            durable: Some(store),
            config,
        }
    }

    /// The registry entry for `user`, created lazily.
    ///
    /// On first touch with a durable store configured, the in-memory
    /// session is hydrated from the persisted turns; hydration failure
    /// degrades to an empty session.
    pub async fn entry(&self, user: UserId) -> Arc<SessionEntry> {
        if let Some(entry) = self.registry.get(user) {
            return entry;
        }
        let mut session = Session::new(user, self.config.memory_cap, self.config.system_prompt.clone());
        if let Some(store) = &self.durable {
            match store.select_recent_turns(user, self.config.memory_cap).await {
                Ok(turns) => session.hydrate(turns),
                Err(err) => {
                    tracing::warn!(%user, error = %err, "history hydration failed; starting empty");
                }
            }
        }
        self.registry.get_or_insert_with(user, move || session)
    }

    /// Append one turn with a fresh sequence, then prune to the cap.
    ///
    /// Never fails the caller: durable faults are logged and absorbed.
    pub async fn append(&self, user: UserId, role: Role, content: impl Into<String>) {
        let entry = self.entry(user).await;
        let mut session = entry.state().await;
        let turn = session.push(role, content);
        let evicted = session.prune();
        if evicted > 0 {
            tracing::debug!(%user, evicted, "pruned history to retention cap");
        }

        let Some(store) = &self.durable else {
            return;
        };
        if let Err(err) = store.insert_turn(user, &turn).await {
            tracing::warn!(%user, error = %err, "durable append failed; continuing in memory");
            return;
        }
        if let Err(err) = store
            .delete_turns_except_recent(user, self.config.durable_cap)
            .await
        {
            tracing::warn!(%user, error = %err, "durable prune failed");
        }
    }

    /// Enforce the retention cap. Idempotent; a no-op within cap.
    pub async fn prune(&self, user: UserId) {
        let entry = self.entry(user).await;
        let evicted = entry.state().await.prune();
        if evicted > 0 {
            tracing::debug!(%user, evicted, "pruned history to retention cap");
        }
    }

    /// Up to `limit` most recent turns, oldest first, ready to hand to
    /// a model call. Never mutates state.
    pub async fn recent_context(&self, user: UserId, limit: usize) -> Vec<Turn> {
        let entry = self.entry(user).await;
        let session = entry.state().await;
        session.recent(limit)
    }

    /// Clear the session, re-seeding the system turn if configured.
    ///
    /// Always succeeds locally; a durable reset failure is logged only.
    pub async fn reset(&self, user: UserId) {
        let entry = self.entry(user).await;
        entry.state().await.reset();

        let Some(store) = &self.durable else {
            return;
        };
        if let Err(err) = store.delete_turns_except_recent(user, 0).await {
            tracing::warn!(%user, error = %err, "durable reset failed; in-memory history cleared");
        }
    }

    /// Read-only vitals for an existing session; `None` if the user
    /// has never spoken.
    pub async fn snapshot(&self, user: UserId) -> Option<SessionSnapshot> {
        let entry = self.registry.get(user)?;
        let session = entry.state().await;
        Some(session.snapshot())
    }
}
