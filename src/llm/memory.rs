//! Opaque per-player memory, written by fire-and-forget updates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::game::PlayerId;

/// Word cap applied to every stored memory string.
pub const MEMORY_WORD_LIMIT: usize = 50;

/// Shared key-value store of per-player operational notes.
///
/// Cloning is cheap and all clones observe the same data. Writes are
/// last-write-wins; a stale update overwriting a newer one is acceptable
/// because memory only flavors prompts and never affects the simulation.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<PlayerId, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored memory for a player, or an empty string.
    #[must_use]
    pub fn get(&self, id: PlayerId) -> String {
        self.inner
            .lock()
            .map(|guard| guard.get(&id).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Store a memory string, truncated to the word cap.
    pub fn set(&self, id: PlayerId, memory: &str) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.insert(id, truncate_words(memory, MEMORY_WORD_LIMIT));
        }
    }

    /// Drop all stored memories (game reset).
    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.clear();
        }
    }
}

/// Keep at most `limit` whitespace-separated tokens of `text`.
#[must_use]
pub fn truncate_words(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().take(limit).collect();
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_is_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.get(1), "");
    }

    #[test]
    fn test_set_and_get() {
        let store = MemoryStore::new();
        store.set(1, "watch the bomb at D4");
        assert_eq!(store.get(1), "watch the bomb at D4");
        store.set(1, "all clear");
        assert_eq!(store.get(1), "all clear");
    }

    #[test]
    fn test_clones_share_state() {
        let store = MemoryStore::new();
        let clone = store.clone();
        store.set(2, "shared");
        assert_eq!(clone.get(2), "shared");
    }

    #[test]
    fn test_clear() {
        let store = MemoryStore::new();
        store.set(1, "notes");
        store.clear();
        assert_eq!(store.get(1), "");
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("a b c d", 2), "a b");
        assert_eq!(truncate_words("  spaced   out  ", 10), "spaced out");
        assert_eq!(truncate_words("", 5), "");

        let long = "word ".repeat(80);
        let capped = truncate_words(&long, MEMORY_WORD_LIMIT);
        assert_eq!(capped.split_whitespace().count(), MEMORY_WORD_LIMIT);
    }

    #[test]
    fn test_set_applies_word_cap() {
        let store = MemoryStore::new();
        let long = "note ".repeat(80);
        store.set(3, &long);
        assert_eq!(store.get(3).split_whitespace().count(), MEMORY_WORD_LIMIT);
    }
}
