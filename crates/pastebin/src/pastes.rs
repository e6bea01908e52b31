//! In-memory paste storage.
//!
//! Pastes live for the lifetime of the process and are keyed by short random
//! identifiers drawn from `[a-zA-Z0-9]`.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Length of a paste identifier.
pub const ID_LEN: usize = 4;

/// A stored paste, serialized as `{"text": ..., "private": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paste {
    /// Pasted text.
    pub text: String,
    /// Whether pages keep the text collapsed until revealed.
    pub private: bool,
}

/// Shared paste map.
#[derive(Debug, Default)]
pub struct PasteStore {
    entries: RwLock<HashMap<String, Paste>>,
}

impl PasteStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `paste` under a fresh random identifier and returns it.
    pub async fn insert(&self, paste: Paste) -> String {
        self.insert_with(paste, random_id).await
    }

    /// Stores `paste` under the first identifier from `next_id` not in use yet.
    async fn insert_with(&self, paste: Paste, mut next_id: impl FnMut() -> String) -> String {
        let mut entries = self.entries.write().await;
        loop {
            if let Entry::Vacant(slot) = entries.entry(next_id()) {
                let id = slot.key().clone();
                slot.insert(paste);
                return id;
            }
        }
    }

    /// Looks up a paste by identifier.
    pub async fn get(&self, id: &str) -> Option<Paste> {
        self.entries.read().await.get(id).cloned()
    }

    /// Number of stored pastes.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing has been pasted yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Draws a random identifier of [`ID_LEN`] alphanumeric characters.
#[must_use]
pub fn random_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn paste(text: &str) -> Paste {
        Paste {
            text: text.into(),
            private: false,
        }
    }

    #[tokio::test]
    async fn insert_then_get() {
        let store = PasteStore::new();
        assert!(store.is_empty().await);

        let id = store.insert(paste("hello")).await;

        assert_eq!(id.len(), ID_LEN);
        assert_eq!(store.get(&id).await, Some(paste("hello")));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        let store = PasteStore::new();
        store.insert(paste("hello")).await;
        assert_eq!(store.get("zzzz").await, None);
        assert_eq!(store.get("").await, None);
    }

    #[tokio::test]
    async fn taken_ids_are_drawn_again() {
        let store = PasteStore::new();
        let first = store.insert_with(paste("one"), || "abcd".to_string()).await;

        let mut draws = vec!["wxyz", "abcd", "abcd"];
        let second = store
            .insert_with(paste("two"), || draws.pop().unwrap_or_default().to_string())
            .await;

        assert_eq!(first, "abcd");
        assert_eq!(second, "wxyz");
        assert_eq!(store.get("abcd").await, Some(paste("one")));
        assert_eq!(store.get("wxyz").await, Some(paste("two")));
    }

    #[test]
    fn paste_serializes_text_and_private() {
        let json = serde_json::to_value(Paste {
            text: "hi".into(),
            private: true,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"text": "hi", "private": true}));
    }

    proptest! {
        #[test]
        fn random_ids_are_alphanumeric(_seed in 0u8..32) {
            let id = random_id();
            prop_assert_eq!(id.len(), ID_LEN);
            prop_assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
