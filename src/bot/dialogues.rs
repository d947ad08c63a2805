//! In-memory store of active dialogues, keyed by chat.
//!
//! Dialogues are lost on restart. An entry untouched for longer than the TTL
//! is treated as absent and dropped on the next access or prune.

use crate::core::dialogue::Dialogue;
use dashmap::DashMap;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use teloxide::types::ChatId;

#[derive(Debug)]
struct Entry {
    dialogue: Dialogue,
    touched: Instant,
}

/// Shared dialogue storage. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DialogueStore {
    entries: Arc<DashMap<ChatId, Entry>>,
    ttl: Duration,
}

impl DialogueStore {
    /// Creates an empty store with the given idle timeout.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        now.duration_since(entry.touched) >= self.ttl
    }

    /// Current dialogue of a chat, if any and not expired.
    #[must_use]
    pub fn get(&self, chat: ChatId) -> Option<Dialogue> {
        let now = Instant::now();
        {
            let entry = self.entries.get(&chat)?;
            if !self.is_expired(&entry, now) {
                return Some(entry.dialogue.clone());
            }
        }
        self.entries
            .remove_if(&chat, |_, entry| self.is_expired(entry, now));
        None
    }

    /// Removes and returns the chat's dialogue, if any and not expired.
    pub fn take(&self, chat: ChatId) -> Option<Dialogue> {
        let (_, entry) = self.entries.remove(&chat)?;
        if self.is_expired(&entry, Instant::now()) {
            return None;
        }
        Some(entry.dialogue)
    }

    /// Removes and returns the chat's dialogue only when `allow` accepts it.
    ///
    /// A refused dialogue stays in place with its timer untouched. Expired
    /// entries are dropped either way.
    pub fn take_if(&self, chat: ChatId, allow: impl FnOnce(&Dialogue) -> bool) -> Option<Dialogue> {
        let now = Instant::now();
        let (_, entry) = self.entries.remove_if(&chat, |_, entry| {
            self.is_expired(entry, now) || allow(&entry.dialogue)
        })?;
        if self.is_expired(&entry, now) {
            return None;
        }
        Some(entry.dialogue)
    }

    /// Stores (or replaces) the chat's dialogue and resets its timer.
    pub fn set(&self, chat: ChatId, dialogue: Dialogue) {
        self.entries.insert(
            chat,
            Entry {
                dialogue,
                touched: Instant::now(),
            },
        );
    }

    /// Drops the chat's dialogue. Returns whether one was active.
    pub fn clear(&self, chat: ChatId) -> bool {
        self.take(chat).is_some()
    }

    /// Removes every expired entry. Returns how many were dropped.
    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !self.is_expired(entry, now));
        before.saturating_sub(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dialogue::Dialogue;

    #[test]
    fn test_set_get_take() {
        let store = DialogueStore::new(Duration::from_secs(60));
        let chat = ChatId(42);

        assert!(store.get(chat).is_none());
        store.set(chat, Dialogue::AddCategory);
        assert_eq!(store.get(chat), Some(Dialogue::AddCategory));
        assert_eq!(store.take(chat), Some(Dialogue::AddCategory));
        assert!(store.get(chat).is_none());
        assert!(!store.clear(chat));
    }

    #[test]
    fn test_expired_dialogues_are_dropped() {
        let store = DialogueStore::new(Duration::ZERO);
        let chat = ChatId(7);

        store.set(chat, Dialogue::start_checkout(None));
        assert!(store.get(chat).is_none());

        store.set(chat, Dialogue::AddCategory);
        store.set(ChatId(8), Dialogue::AddCategory);
        assert_eq!(store.prune_expired(), 2);
    }

    #[test]
    fn test_take_if_refused_keeps_dialogue() {
        let store = DialogueStore::new(Duration::from_secs(60));
        let chat = ChatId(5);
        store.set(chat, Dialogue::AddCategory);

        assert!(store.take_if(chat, |d| d.is_checkout()).is_none());
        assert_eq!(store.get(chat), Some(Dialogue::AddCategory));

        assert_eq!(store.take_if(chat, |_| true), Some(Dialogue::AddCategory));
        assert!(store.get(chat).is_none());
    }

    #[test]
    fn test_take_if_drops_expired() {
        let store = DialogueStore::new(Duration::ZERO);
        let chat = ChatId(6);
        store.set(chat, Dialogue::AddCategory);

        assert!(store.take_if(chat, |_| false).is_none());
        assert_eq!(store.prune_expired(), 0);
    }

    #[test]
    fn test_chats_are_independent() {
        let store = DialogueStore::new(Duration::from_secs(60));
        store.set(ChatId(1), Dialogue::AddCategory);
        store.set(ChatId(2), Dialogue::start_add_product());

        assert!(store.clear(ChatId(1)));
        assert_eq!(store.get(ChatId(2)), Some(Dialogue::start_add_product()));
    }
}
