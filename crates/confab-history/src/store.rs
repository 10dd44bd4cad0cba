//! Durable turn persistence.
//!
//! The trait mirrors a row store keyed by `(user, sequence)`. The
//! in-tree implementation keeps one JSON file per user; any row
//! database fits behind the same trait.

use crate::error::StoreError;
use confab_types::{Turn, UserId};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

/// A boxed future for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Row-oriented turn persistence, keyed by `(user, sequence)`.
///
/// Callers treat every operation as best-effort: failures are logged
/// by `HistoryStore` and the conversation continues in memory.
pub trait TurnStore: Send + Sync {
    /// Persist one turn. Writing the same `(user, sequence)` twice
    /// must not produce a duplicate row.
    fn insert_turn<'a>(&'a self, user: UserId, turn: &'a Turn) -> StoreFuture<'a, ()>;

    /// The `limit` most recent turns for `user`, oldest first.
    fn select_recent_turns<'a>(&'a self, user: UserId, limit: usize) -> StoreFuture<'a, Vec<Turn>>;

    /// Delete all but the `keep` most recent turns. `keep == 0`
    /// removes everything for the user.
    fn delete_turns_except_recent<'a>(&'a self, user: UserId, keep: usize) -> StoreFuture<'a, ()>;
}

/// File-backed turn store: one JSON file per user under `turns/`.
///
/// Writes are atomic (.tmp → rename). An unreadable or unparseable
/// file is logged and treated as empty rather than failing the
/// conversation.
pub struct FileTurnStore {
    turns_dir: PathBuf,
}

impl FileTurnStore {
    /// Create a store, ensuring the turns directory exists.
    pub async fn new(data_dir: PathBuf) -> Result<Self, StoreError> {
        let turns_dir = data_dir.join("turns");
        tokio::fs::create_dir_all(&turns_dir).await?;
        Ok(Self { turns_dir })
    }

    fn user_path(&self, user: UserId) -> PathBuf {
        self.turns_dir.join(format!("{user}.json"))
    }

    async fn read_turns(&self, user: UserId) -> Result<Vec<Turn>, StoreError> {
        let path = self.user_path(user);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&data) {
            Ok(turns) => Ok(turns),
            Err(e) => {
                tracing::warn!(%user, error = %e, "unparseable turn file; treating as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn write_turns(&self, user: UserId, turns: &[Turn]) -> Result<(), StoreError> {
        let path = self.user_path(user);
        let tmp_path = path.with_extension("tmp");
        let json = serde_json::to_string_pretty(turns)?;
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

impl TurnStore for FileTurnStore {
    fn insert_turn<'a>(&'a self, user: UserId, turn: &'a Turn) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut turns = self.read_turns(user).await?;
            if turns.iter().any(|t| t.sequence == turn.sequence) {
                return Ok(()); // retried write, row already present
            }
            turns.push(turn.clone());
            turns.sort_by_key(|t| t.sequence);
            self.write_turns(user, &turns).await
        })
    }

    fn select_recent_turns<'a>(&'a self, user: UserId, limit: usize) -> StoreFuture<'a, Vec<Turn>> {
        Box::pin(async move {
            let turns = self.read_turns(user).await?;
            let start = turns.len().saturating_sub(limit);
            Ok(turns[start..].to_vec())
        })
    }

    fn delete_turns_except_recent<'a>(&'a self, user: UserId, keep: usize) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            if keep == 0 {
                return match tokio::fs::remove_file(self.user_path(user)).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(e.into()),
                };
            }
            let turns = self.read_turns(user).await?;
            if turns.len() <= keep {
                return Ok(());
            }
            let start = turns.len() - keep;
            self.write_turns(user, &turns[start..]).await
        })
    }
}
