//! Per-conversation bounded context buffers.

use std::collections::HashMap;

use crate::message::ConversationId;
use crate::turn::Turn;

/// Default bound on retained turns per conversation, system turn included.
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Default bound on distinct tracked conversations.
pub const DEFAULT_MAX_CONVERSATIONS: usize = 1024;

struct Entry {
    turns: Vec<Turn>,
    last_used: u64,
}

/// Conversation-keyed turn buffers with a pinned system instruction.
///
/// Owned exclusively by the message router; nothing here is shared or
/// persisted. Each buffer keeps the system turn at index 0 forever and
/// evicts the oldest user/model pair when the turn bound is exceeded, so a
/// coherent exchange unit is dropped rather than truncating mid-exchange.
/// The number of distinct conversations is itself bounded; exceeding it
/// evicts the least recently used conversation wholesale.
pub struct ContextStore {
    conversations: HashMap<ConversationId, Entry>,
    system_prompt: String,
    max_turns: usize,
    max_conversations: usize,
    clock: u64,
}

impl ContextStore {
    /// Create a store whose buffers are seeded with `system_prompt`.
    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            conversations: HashMap::new(),
            system_prompt: system_prompt.into(),
            max_turns: DEFAULT_MAX_TURNS,
            max_conversations: DEFAULT_MAX_CONVERSATIONS,
            clock: 0,
        }
    }

    /// Override the per-conversation turn bound.
    ///
    /// Values below 3 are clamped: the buffer must hold the system turn
    /// plus at least one user/model pair.
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(3);
        self
    }

    /// Override the distinct-conversation bound.
    #[must_use]
    pub fn with_max_conversations(mut self, max_conversations: usize) -> Self {
        self.max_conversations = max_conversations.max(1);
        self
    }

    /// Append a turn, creating the buffer (seeded with the system turn) if
    /// absent.
    ///
    /// If the resulting length exceeds the turn bound, the two oldest
    /// non-system turns are removed; index 0 is never touched.
    pub fn append(&mut self, id: &ConversationId, turn: Turn) {
        let max_turns = self.max_turns;
        let entry = self.entry(id);
        entry.turns.push(turn);
        if entry.turns.len() > max_turns {
            entry.turns.drain(1..3);
        }
    }

    /// The ordered turns to submit as completion context: system turn
    /// first, then all retained turns chronologically.
    ///
    /// Empty if the conversation has never been seen.
    #[must_use]
    pub fn snapshot(&self, id: &ConversationId) -> &[Turn] {
        self.conversations
            .get(id)
            .map_or(&[], |entry| entry.turns.as_slice())
    }

    /// Drop all turns for a conversation and re-seed with the system turn
    /// only. Idempotent.
    pub fn reset(&mut self, id: &ConversationId) {
        let system = Turn::system(self.system_prompt.clone());
        let entry = self.entry(id);
        entry.turns.clear();
        entry.turns.push(system);
    }

    /// Number of distinct conversations currently tracked.
    #[must_use]
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    fn entry(&mut self, id: &ConversationId) -> &mut Entry {
        self.clock += 1;
        if !self.conversations.contains_key(id) && self.conversations.len() >= self.max_conversations
        {
            self.evict_lru();
        }
        let clock = self.clock;
        let entry = self
            .conversations
            .entry(id.clone())
            .or_insert_with(|| Entry {
                turns: vec![Turn::system(self.system_prompt.clone())],
                last_used: clock,
            });
        entry.last_used = clock;
        entry
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .conversations
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            tracing::debug!(conversation = %id, "evicting least recently used conversation");
            self.conversations.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::Role;

    const PROMPT: &str = "be helpful";

    fn id(name: &str) -> ConversationId {
        ConversationId::from(name)
    }

    #[test]
    fn first_append_seeds_system_turn() {
        let mut store = ContextStore::new(PROMPT);
        store.append(&id("a"), Turn::user("hello"));

        let turns = store.snapshot(&id("a"));
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], Turn::system(PROMPT));
        assert_eq!(turns[1], Turn::user("hello"));
    }

    #[test]
    fn system_turn_pinned_for_any_append_sequence() {
        let mut store = ContextStore::new(PROMPT);
        for i in 0..50 {
            store.append(&id("a"), Turn::user(format!("q{i}")));
            store.append(&id("a"), Turn::model(format!("a{i}")));
            assert_eq!(store.snapshot(&id("a"))[0].role, Role::System);
            assert!(store.snapshot(&id("a")).len() <= DEFAULT_MAX_TURNS);
        }
    }

    #[test]
    fn overflow_evicts_oldest_pair() {
        let mut store = ContextStore::new(PROMPT);
        // System + 9 turns fills the default bound of 10.
        for i in 0..9 {
            store.append(&id("a"), Turn::user(format!("turn{i}")));
        }
        assert_eq!(store.snapshot(&id("a")).len(), 10);

        // The 11th entry trims back to 9: system + 8, oldest two gone.
        store.append(&id("a"), Turn::user("turn9"));
        let turns = store.snapshot(&id("a"));
        assert_eq!(turns.len(), 9);
        assert_eq!(turns[0], Turn::system(PROMPT));
        assert_eq!(turns[1], Turn::user("turn2"));
        assert_eq!(turns[8], Turn::user("turn9"));
    }

    #[test]
    fn reset_is_idempotent() {
        let mut store = ContextStore::new(PROMPT);
        store.append(&id("a"), Turn::user("hello"));
        store.append(&id("a"), Turn::model("hi"));

        store.reset(&id("a"));
        let once: Vec<Turn> = store.snapshot(&id("a")).to_vec();
        store.reset(&id("a"));
        let twice: Vec<Turn> = store.snapshot(&id("a")).to_vec();

        assert_eq!(once, vec![Turn::system(PROMPT)]);
        assert_eq!(once, twice);
    }

    #[test]
    fn reset_seeds_unseen_conversation() {
        let mut store = ContextStore::new(PROMPT);
        store.reset(&id("fresh"));
        assert_eq!(store.snapshot(&id("fresh")), &[Turn::system(PROMPT)]);
    }

    #[test]
    fn snapshot_empty_for_unknown_conversation() {
        let store = ContextStore::new(PROMPT);
        assert!(store.snapshot(&id("nobody")).is_empty());
    }

    #[test]
    fn turn_bound_is_clamped() {
        let mut store = ContextStore::new(PROMPT).with_max_turns(1);
        store.append(&id("a"), Turn::user("one"));
        store.append(&id("a"), Turn::user("two"));
        store.append(&id("a"), Turn::user("three"));
        let turns = store.snapshot(&id("a"));
        assert_eq!(turns[0].role, Role::System);
        assert!(turns.len() <= 3);
    }

    #[test]
    fn lru_conversation_eviction() {
        let mut store = ContextStore::new(PROMPT).with_max_conversations(2);
        store.append(&id("a"), Turn::user("hi"));
        store.append(&id("b"), Turn::user("hi"));
        // Touch "a" so "b" is now the least recently used.
        store.append(&id("a"), Turn::model("hello"));

        store.append(&id("c"), Turn::user("hi"));
        assert_eq!(store.conversation_count(), 2);
        assert!(store.snapshot(&id("b")).is_empty());
        assert!(!store.snapshot(&id("a")).is_empty());
        assert!(!store.snapshot(&id("c")).is_empty());
    }
}
