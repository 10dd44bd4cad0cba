//! One reply cycle: context, completion, duplicate suppression.

use crate::window::ReplyWindow;
use confab_history::HistoryStore;
use confab_types::{Completer, ModelError, Role, Turn, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Appended to the last user turn when the first candidate repeats a
/// recent reply.
const VARIATION_DIRECTIVE: &str =
    "(Give a different answer than the one you gave before.)";

/// Knobs for the reply cycle.
#[derive(Debug, Clone)]
pub struct ReplyConfig {
    /// Turns handed to the completer per call.
    pub context_limit: usize,
    /// Recent-reply window size; 0 disables duplicate detection.
    pub window: usize,
    /// Upper bound on one completer invocation.
    pub completion_timeout: Duration,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            context_limit: 20,
            window: 5,
            completion_timeout: Duration::from_secs(60),
        }
    }
}

/// Orchestrates reply cycles against a [`HistoryStore`] and a
/// [`Completer`].
///
/// Turns for one user are serialized by the per-user reply gate;
/// unrelated users proceed concurrently. The gate is distinct from the
/// history store's session lock, so a completer that re-enters the
/// store cannot deadlock.
pub struct ResponseSession {
    history: Arc<HistoryStore>,
    completer: Arc<dyn Completer>,
    config: ReplyConfig,
    windows: Mutex<HashMap<UserId, ReplyWindow>>,
}

impl ResponseSession {
    pub fn new(
        history: Arc<HistoryStore>,
        completer: Arc<dyn Completer>,
        config: ReplyConfig,
    ) -> Self {
        Self {
            history,
            completer,
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Run one reply cycle for `user`.
    ///
    /// The user turn is recorded before the completion call and stays
    /// recorded even when the call fails — a user's message is useful
    /// context with or without a paired reply. Model failures and
    /// timeouts surface as [`ModelError`]; store faults never do.
    pub async fn reply(
        &self,
        user: UserId,
        message: impl Into<String>,
    ) -> Result<String, ModelError> {
        let entry = self.history.entry(user).await;
        let _gate = entry.reply_guard().await;

        self.history.append(user, Role::User, message).await;
        let context = self
            .history
            .recent_context(user, self.config.context_limit)
            .await;

        let first = self.complete_with_timeout(&context).await?;

        let text = if self.is_recent_repeat(user, &first) {
            tracing::debug!(
                %user,
                completer = self.completer.name(),
                "candidate repeats a recent reply; regenerating once"
            );
            match self.complete_with_timeout(&perturb(&context)).await {
                // The second candidate wins even if it collides again.
                Ok(second) => second,
                Err(err) => {
                    tracing::debug!(%user, error = %err, "regeneration failed; keeping first candidate");
                    first
                }
            }
        } else {
            first
        };

        self.remember_reply(user, &text);
        self.history.append(user, Role::Assistant, text.clone()).await;
        Ok(text)
    }

    /// Empty the user's history and recent-reply window in one call.
    pub async fn reset(&self, user: UserId) {
        self.history.reset(user).await;
        if let Some(window) = self.lock_windows().get_mut(&user) {
            window.clear();
        }
    }

    async fn complete_with_timeout(&self, context: &[Turn]) -> Result<String, ModelError> {
        match tokio::time::timeout(
            self.config.completion_timeout,
            self.completer.complete(context),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout),
        }
    }

    fn is_recent_repeat(&self, user: UserId, text: &str) -> bool {
        if self.config.window == 0 {
            return false;
        }
        self.lock_windows()
            .get(&user)
            .is_some_and(|w| w.contains(text))
    }

    fn remember_reply(&self, user: UserId, text: &str) {
        let mut windows = self.lock_windows();
        windows
            .entry(user)
            .or_insert_with(|| ReplyWindow::new(self.config.window))
            .push(text.to_string());
    }

    fn lock_windows(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, ReplyWindow>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clone the context with the variation directive appended to the last
/// user turn. A context without a user turn is returned unchanged.
fn perturb(context: &[Turn]) -> Vec<Turn> {
    let mut perturbed = context.to_vec();
    if let Some(last_user) = perturbed.iter_mut().rev().find(|t| t.role == Role::User) {
        last_user.content.push_str("\n\n");
        last_user.content.push_str(VARIATION_DIRECTIVE);
    }
    perturbed
}
