//! In-memory session state: ordered turns under a retention cap.

use chrono::{DateTime, Utc};
use confab_types::{Role, Turn, UserId, preview_line};

/// Sequence 0 is reserved for the system turn so that a seeded system
/// turn always sorts before the first real turn, including after a
/// restart over a durable store.
const FIRST_TURN_SEQUENCE: u64 = 1;

/// One user's ordered conversation history.
///
/// Turns are kept oldest first, strictly by `sequence`. After every
/// mutation `turns.len() <= retention_cap` holds; pruning evicts the
/// oldest non-system turns and never the system turn.
#[derive(Debug)]
pub struct Session {
    user_id: UserId,
    turns: Vec<Turn>,
    next_sequence: u64,
    retention_cap: usize,
    system_prompt: Option<String>,
    updated_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session, seeding the system turn if configured.
    pub fn new(user_id: UserId, retention_cap: usize, system_prompt: Option<String>) -> Self {
        let mut session = Self {
            user_id,
            turns: Vec::new(),
            next_sequence: FIRST_TURN_SEQUENCE,
            retention_cap,
            system_prompt,
            updated_at: Utc::now(),
        };
        session.seed_system_turn();
        session
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append one turn with a freshly assigned sequence.
    ///
    /// Returns a clone of the stored turn for the durable mirror.
    pub fn push(&mut self, role: Role, content: impl Into<String>) -> Turn {
        let turn = Turn::new(role, content, self.next_sequence);
        self.next_sequence += 1;
        self.updated_at = Utc::now();
        self.turns.push(turn.clone());
        turn
    }

    /// Evict oldest non-system turns until the cap holds.
    ///
    /// Idempotent; returns how many turns were evicted.
    pub fn prune(&mut self) -> usize {
        let mut evicted = 0;
        while self.turns.len() > self.retention_cap {
            let Some(victim) = self.turns.iter().position(|t| !t.is_system()) else {
                break; // only the system turn left
            };
            self.turns.remove(victim);
            evicted += 1;
        }
        debug_assert!(
            self.turns.len() <= self.retention_cap || self.turns.iter().all(Turn::is_system),
            "retention cap violated after prune"
        );
        evicted
    }

    /// Up to `limit` most recent turns, oldest first.
    ///
    /// A configured system turn is always included at the front; the
    /// remaining slots are filled with the newest turns.
    pub fn recent(&self, limit: usize) -> Vec<Turn> {
        if limit == 0 {
            return Vec::new();
        }
        if self.turns.len() <= limit {
            return self.turns.clone();
        }
        match self.turns.first() {
            Some(first) if first.is_system() => {
                let mut out = Vec::with_capacity(limit);
                out.push(first.clone());
                out.extend_from_slice(&self.turns[self.turns.len() - (limit - 1)..]);
                out
            }
            _ => self.turns[self.turns.len() - limit..].to_vec(),
        }
    }

    /// Clear all turns and re-seed the system turn if configured.
    ///
    /// The sequence counter keeps climbing so `(user, sequence)` stays
    /// unique in the durable store across resets.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.updated_at = Utc::now();
        self.seed_system_turn();
    }

    /// Load previously persisted turns into an empty session.
    ///
    /// Loaded turns are ordered by sequence and the counter resumes
    /// past the highest loaded value. System turns are re-seeded from
    /// configuration, never from the store.
    pub fn hydrate(&mut self, mut loaded: Vec<Turn>) {
        loaded.retain(|t| !t.is_system());
        loaded.sort_by_key(|t| t.sequence);
        if let Some(last) = loaded.last() {
            self.next_sequence = self.next_sequence.max(last.sequence + 1);
        }
        self.turns.extend(loaded);
        self.prune();
    }

    /// Lightweight read-only stats for host-side listing.
    pub fn snapshot(&self) -> SessionSnapshot {
        let preview = self
            .turns
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| preview_line(&t.content, 80))
            .unwrap_or_default();
        SessionSnapshot {
            user_id: self.user_id,
            turn_count: self.turns.len(),
            updated_at: self.updated_at,
            preview,
        }
    }

    fn seed_system_turn(&mut self) {
        if let Some(prompt) = &self.system_prompt {
            self.turns.push(Turn::new(Role::System, prompt.clone(), 0));
        }
    }
}

/// Read-only view of a session's vitals.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub user_id: UserId,
    pub turn_count: usize,
    pub updated_at: DateTime<Utc>,
    pub preview: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(turns: &[Turn]) -> Vec<&str> {
        turns.iter().map(|t| t.content.as_str()).collect()
    }

    #[test]
    fn cap_holds_after_every_append() {
        let mut session = Session::new(UserId(1), 5, None);
        for i in 0..40 {
            session.push(Role::User, format!("msg {i}"));
            session.prune();
            assert!(session.len() <= 5, "cap violated at append {i}");
        }
    }

    #[test]
    fn prune_evicts_oldest_first() {
        let mut session = Session::new(UserId(1), 2, None);
        session.push(Role::User, "a");
        session.push(Role::Assistant, "A");
        session.push(Role::User, "b");
        session.prune();
        assert_eq!(contents(session.turns()), vec!["A", "b"]);
    }

    #[test]
    fn prune_is_idempotent() {
        let mut session = Session::new(UserId(1), 3, None);
        session.push(Role::User, "a");
        session.push(Role::Assistant, "b");
        assert_eq!(session.prune(), 0);
        assert_eq!(session.prune(), 0);
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn system_turn_survives_pruning() {
        let mut session = Session::new(UserId(1), 3, Some("be helpful".into()));
        for i in 0..10 {
            session.push(Role::User, format!("msg {i}"));
            session.prune();
        }
        assert_eq!(session.len(), 3);
        assert!(session.turns()[0].is_system());
        assert_eq!(session.turns()[0].content, "be helpful");
    }

    #[test]
    fn ordering_is_strictly_by_sequence() {
        let mut session = Session::new(UserId(1), 50, None);
        for i in 0..20 {
            session.push(Role::User, format!("msg {i}"));
        }
        let seqs: Vec<u64> = session.turns().iter().map(|t| t.sequence).collect();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn recent_returns_all_when_limit_exceeds_stored() {
        let mut session = Session::new(UserId(1), 10, None);
        session.push(Role::User, "a");
        session.push(Role::Assistant, "b");
        assert_eq!(session.recent(100).len(), 2);
    }

    #[test]
    fn recent_takes_newest_oldest_first() {
        let mut session = Session::new(UserId(1), 10, None);
        for i in 0..6 {
            session.push(Role::User, format!("msg {i}"));
        }
        let recent = session.recent(3);
        assert_eq!(contents(&recent), vec!["msg 3", "msg 4", "msg 5"]);
    }

    #[test]
    fn recent_always_includes_system_turn() {
        let mut session = Session::new(UserId(1), 10, Some("sys".into()));
        for i in 0..6 {
            session.push(Role::User, format!("msg {i}"));
        }
        let recent = session.recent(3);
        assert_eq!(contents(&recent), vec!["sys", "msg 4", "msg 5"]);
    }

    #[test]
    fn recent_zero_limit_is_empty() {
        let mut session = Session::new(UserId(1), 10, None);
        session.push(Role::User, "a");
        assert!(session.recent(0).is_empty());
    }

    #[test]
    fn reset_reseeds_system_turn() {
        let mut session = Session::new(UserId(1), 10, Some("sys".into()));
        session.push(Role::User, "hello");
        session.push(Role::Assistant, "hi");
        session.reset();
        assert_eq!(session.len(), 1);
        assert!(session.turns()[0].is_system());
    }

    #[test]
    fn reset_without_system_prompt_empties() {
        let mut session = Session::new(UserId(1), 10, None);
        session.push(Role::User, "hello");
        session.reset();
        assert!(session.is_empty());
    }

    #[test]
    fn sequences_keep_climbing_across_reset() {
        let mut session = Session::new(UserId(1), 10, None);
        session.push(Role::User, "a");
        let before = session.push(Role::User, "b").sequence;
        session.reset();
        let after = session.push(Role::User, "c").sequence;
        assert!(after > before);
    }

    #[test]
    fn hydrate_resumes_sequence() {
        let loaded = vec![
            Turn::new(Role::User, "old question", 7),
            Turn::new(Role::Assistant, "old answer", 8),
        ];
        let mut session = Session::new(UserId(1), 10, None);
        session.hydrate(loaded);
        assert_eq!(session.len(), 2);
        let next = session.push(Role::User, "new").sequence;
        assert_eq!(next, 9);
    }

    #[test]
    fn hydrate_sorts_and_caps() {
        let loaded = vec![
            Turn::new(Role::Assistant, "second", 4),
            Turn::new(Role::User, "first", 3),
            Turn::new(Role::User, "third", 5),
        ];
        let mut session = Session::new(UserId(1), 2, None);
        session.hydrate(loaded);
        assert_eq!(contents(session.turns()), vec!["second", "third"]);
    }

    #[test]
    fn hydrate_keeps_system_turn_in_front() {
        let loaded = vec![Turn::new(Role::User, "persisted", 3)];
        let mut session = Session::new(UserId(1), 10, Some("sys".into()));
        session.hydrate(loaded);
        assert_eq!(contents(session.turns()), vec!["sys", "persisted"]);
    }

    #[test]
    fn snapshot_previews_last_user_turn() {
        let mut session = Session::new(UserId(9), 10, None);
        session.push(Role::User, "first question");
        session.push(Role::Assistant, "answer");
        session.push(Role::User, "second question");
        let snap = session.snapshot();
        assert_eq!(snap.user_id, UserId(9));
        assert_eq!(snap.turn_count, 3);
        assert_eq!(snap.preview, "second question");
    }

    #[test]
    fn snapshot_empty_preview_without_user_turns() {
        let session = Session::new(UserId(9), 10, Some("sys".into()));
        assert_eq!(session.snapshot().preview, "");
    }
}
