//! Default-persona rotation and description selection.
//!
//! One [`CharacterPromptManager`] serves one logical rotation session: it
//! owns a shuffled working copy of the persona catalog plus a cursor, and
//! consults the shared rotation store to avoid handing the same default
//! persona to the same user twice in a cycle. Instances are cheap and are
//! expected to be created per request; only the store is shared between
//! them.
//!
//! Two manager instances for the same user can race on the store and both
//! issue the same persona. That race is accepted: the store is a cosmetic
//! duplicate-avoidance mechanism, not an allocator, and locking it would
//! buy nothing the product needs.

use std::sync::Arc;

use rand::seq::SliceRandom;
use serde_json::Value;

use crate::character::catalog;
use crate::character::description::{extract_name, Description};
use crate::character::normalizer;
use crate::character::store::{used_set_key, RotationStore};

/// Per-session persona selection state.
pub struct CharacterPromptManager {
    user_id: i64,
    used_key: String,
    store: Option<Arc<dyn RotationStore>>,
    shuffled_pool: Vec<Description>,
    pointer: usize,
}

impl CharacterPromptManager {
    /// Create a manager over the default persona catalog.
    ///
    /// `store` is the shared rotation state; pass `None` to rotate without
    /// cross-request dedup (personas may then repeat between requests).
    pub fn new(user_id: i64, store: Option<Arc<dyn RotationStore>>) -> Self {
        Self::with_pool(user_id, store, catalog::default_personas().to_vec())
    }

    /// Create a manager over a custom persona pool.
    ///
    /// # Panics
    /// Panics when `pool` is empty; an empty rotation pool is a programmer
    /// error, not a runtime condition.
    pub fn with_pool(
        user_id: i64,
        store: Option<Arc<dyn RotationStore>>,
        pool: Vec<Description>,
    ) -> Self {
        assert!(!pool.is_empty(), "rotation pool must not be empty");
        let mut shuffled_pool = pool;
        shuffled_pool.shuffle(&mut rand::thread_rng());
        Self {
            used_key: used_set_key(user_id),
            user_id,
            store,
            shuffled_pool,
            pointer: 0,
        }
    }

    /// The user this manager rotates personas for.
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Has `name` already been issued to this user in the current cycle?
    ///
    /// Fails open: with no store attached, or when the store errors, the
    /// name counts as unused so a store outage never blocks generation.
    /// The no-repeat guarantee is silently lost for the duration of an
    /// outage.
    async fn has_used(&self, name: &str) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        match store.is_member(&self.used_key, name).await {
            Ok(used) => used,
            Err(e) => {
                log::warn!(
                    "rotation store check failed for user {}: {e}; treating {name:?} as unused",
                    self.user_id
                );
                false
            }
        }
    }

    async fn mark_used(&self, name: &str) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.add_member(&self.used_key, name).await {
            log::warn!(
                "rotation store update failed for user {}: {e}; {name:?} not recorded",
                self.user_id
            );
        }
    }

    async fn clear_used(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.delete_key(&self.used_key).await {
            log::warn!(
                "rotation store reset failed for user {}: {e}",
                self.user_id
            );
        }
    }

    fn reshuffle(&mut self) {
        self.shuffled_pool.shuffle(&mut rand::thread_rng());
        self.pointer = 0;
    }

    /// Pick the next default persona this user has not seen in the current
    /// cycle.
    ///
    /// Walks the shuffled pool, reshuffling whenever the cursor runs off
    /// the end, and skips personas the store reports as used. When every
    /// persona has been issued this cycle, the used-set is cleared and a
    /// fresh cycle begins immediately — this call never fails to produce a
    /// persona.
    pub async fn get_rotating_default_description(&mut self) -> Description {
        let mut attempts = 0;
        while attempts < self.shuffled_pool.len() {
            if self.pointer >= self.shuffled_pool.len() {
                self.reshuffle();
            }
            let candidate = self.shuffled_pool[self.pointer].clone();
            self.pointer += 1;
            let name = extract_name(&candidate);

            if !self.has_used(&name).await {
                self.mark_used(&name).await;
                log::debug!("user {}: issuing default persona {name:?}", self.user_id);
                return candidate;
            }

            attempts += 1;
        }

        // Every persona has been issued this cycle; start over. The first
        // post-reset candidate is issued without re-checking the store —
        // a concurrent writer racing the clear can double-issue here,
        // which is the documented race above.
        log::debug!(
            "user {}: default persona pool exhausted, starting a new cycle",
            self.user_id
        );
        self.clear_used().await;
        self.reshuffle();
        let candidate = self.shuffled_pool[0].clone();
        self.pointer = 1;
        let name = extract_name(&candidate);
        self.mark_used(&name).await;
        log::debug!("user {}: issuing default persona {name:?}", self.user_id);
        candidate
    }

    /// Decide which description a generation request should use.
    ///
    /// Usable input is returned exactly as supplied — same records, same
    /// order, same keys. Anything else (non-list input, an empty list, all
    /// values blank) silently falls back to default-persona rotation;
    /// malformed input is a routing decision here, never an error.
    pub async fn get_character_description(&mut self, raw: Value) -> Description {
        match normalizer::normalize(raw) {
            Some(description) => description,
            None => {
                log::debug!(
                    "user {}: unusable description input, rotating a default persona",
                    self.user_id
                );
                self.get_rotating_default_description().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::store::{InMemoryRotationStore, StoreError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashSet;

    fn small_pool() -> Vec<Description> {
        ["Airi", "Luna", "Zeta", "Kai"]
            .iter()
            .map(|name| vec![json!({ "Name": *name }), json!({"Gender": "Female"})])
            .collect()
    }

    fn manager_with_store(store: Arc<dyn RotationStore>) -> CharacterPromptManager {
        CharacterPromptManager::with_pool(87, Some(store), small_pool())
    }

    #[tokio::test]
    async fn no_repeats_within_one_cycle() {
        let store = Arc::new(InMemoryRotationStore::new());
        let mut manager = manager_with_store(store);

        let mut seen = HashSet::new();
        for _ in 0..4 {
            let desc = manager.get_rotating_default_description().await;
            assert!(seen.insert(extract_name(&desc)), "persona repeated early");
        }
        assert_eq!(seen.len(), 4);
    }

    #[tokio::test]
    async fn cycle_restarts_only_after_exhaustion() {
        let store = Arc::new(InMemoryRotationStore::new());
        let mut manager = manager_with_store(store.clone());

        let mut seen = HashSet::new();
        for _ in 0..4 {
            seen.insert(extract_name(&manager.get_rotating_default_description().await));
        }
        assert_eq!(seen.len(), 4);

        // The fifth call starts a fresh cycle: its persona was necessarily
        // seen before, and the used-set now holds exactly that one name.
        let fifth = extract_name(&manager.get_rotating_default_description().await);
        assert!(seen.contains(&fifth));
        assert_eq!(store.len(&used_set_key(87)), 1);
        assert!(store
            .is_member(&used_set_key(87), &fifth)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn two_managers_share_rotation_state_through_the_store() {
        let store: Arc<dyn RotationStore> = Arc::new(InMemoryRotationStore::new());
        let mut first = manager_with_store(store.clone());
        let mut second = manager_with_store(store);

        let mut seen = HashSet::new();
        seen.insert(extract_name(&first.get_rotating_default_description().await));
        seen.insert(extract_name(&second.get_rotating_default_description().await));
        seen.insert(extract_name(&first.get_rotating_default_description().await));
        seen.insert(extract_name(&second.get_rotating_default_description().await));
        assert_eq!(seen.len(), 4);
    }

    struct FailingStore;

    #[async_trait]
    impl RotationStore for FailingStore {
        async fn is_member(&self, _: &str, _: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable {
                message: "connection refused".into(),
            })
        }
        async fn add_member(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable {
                message: "connection refused".into(),
            })
        }
        async fn delete_key(&self, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable {
                message: "connection refused".into(),
            })
        }
    }

    #[tokio::test]
    async fn store_outage_fails_open() {
        let mut manager = manager_with_store(Arc::new(FailingStore));
        for _ in 0..10 {
            let desc = manager.get_rotating_default_description().await;
            assert_ne!(extract_name(&desc), "unknown");
        }
    }

    #[tokio::test]
    async fn missing_store_still_rotates() {
        let mut manager = CharacterPromptManager::with_pool(1, None, small_pool());
        for _ in 0..10 {
            let desc = manager.get_rotating_default_description().await;
            assert!(!desc.is_empty());
        }
    }

    #[tokio::test]
    async fn usable_input_passes_through_unchanged() {
        let store = Arc::new(InMemoryRotationStore::new());
        let mut manager = manager_with_store(store);

        let raw = json!([{"Name": "   "}, {"Personality": "Brave"}]);
        let result = manager.get_character_description(raw.clone()).await;
        assert_eq!(Value::Array(result), raw);
    }

    #[tokio::test]
    async fn non_list_input_falls_back_to_the_pool() {
        let store = Arc::new(InMemoryRotationStore::new());
        let mut manager = manager_with_store(store);

        let pool_names: HashSet<String> = small_pool().iter().map(|d| extract_name(d)).collect();
        let result = manager.get_character_description(json!("0")).await;
        assert!(pool_names.contains(&extract_name(&result)));
    }

    #[tokio::test]
    async fn empty_list_input_falls_back_to_the_pool() {
        let store = Arc::new(InMemoryRotationStore::new());
        let mut manager = manager_with_store(store);

        let pool_names: HashSet<String> = small_pool().iter().map(|d| extract_name(d)).collect();
        let result = manager.get_character_description(json!([])).await;
        assert!(pool_names.contains(&extract_name(&result)));
    }

    #[tokio::test]
    async fn blank_only_input_falls_back_to_the_pool() {
        let store = Arc::new(InMemoryRotationStore::new());
        let mut manager = manager_with_store(store);

        let pool_names: HashSet<String> = small_pool().iter().map(|d| extract_name(d)).collect();
        let raw = json!([{"Name": "  "}, {"Gender": ""}]);
        let result = manager.get_character_description(raw).await;
        assert!(pool_names.contains(&extract_name(&result)));
    }

    #[tokio::test]
    async fn full_catalog_rotation_holds_the_no_repeat_law() {
        let store: Arc<dyn RotationStore> = Arc::new(InMemoryRotationStore::new());
        let mut manager = CharacterPromptManager::new(87, Some(store));

        let catalog_size = catalog::default_personas().len();
        let mut seen = HashSet::new();
        for _ in 0..catalog_size {
            let desc = manager.get_rotating_default_description().await;
            assert!(seen.insert(extract_name(&desc)));
        }
        assert_eq!(seen.len(), catalog_size);
    }
}
