//! In-process rotation store.
//!
//! Suitable for tests and single-process deployments. State does not
//! survive a restart; use the SQLite adapter (or a host-provided store)
//! when rotation must persist.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{RotationStore, StoreError};

/// Thread-safe in-memory set store.
#[derive(Debug, Default)]
pub struct InMemoryRotationStore {
    sets: DashMap<String, HashSet<String>>,
}

impl InMemoryRotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of members currently recorded under `set_key`.
    pub fn len(&self, set_key: &str) -> usize {
        self.sets.get(set_key).map(|s| s.len()).unwrap_or(0)
    }

    /// True when no members are recorded under `set_key`.
    pub fn is_empty(&self, set_key: &str) -> bool {
        self.len(set_key) == 0
    }
}

#[async_trait]
impl RotationStore for InMemoryRotationStore {
    async fn is_member(&self, set_key: &str, value: &str) -> Result<bool, StoreError> {
        Ok(self
            .sets
            .get(set_key)
            .map(|members| members.contains(value))
            .unwrap_or(false))
    }

    async fn add_member(&self, set_key: &str, value: &str) -> Result<(), StoreError> {
        self.sets
            .entry(set_key.to_string())
            .or_default()
            .insert(value.to_string());
        Ok(())
    }

    async fn delete_key(&self, set_key: &str) -> Result<(), StoreError> {
        self.sets.remove(set_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn membership_round_trip() {
        let store = InMemoryRotationStore::new();
        assert!(!store.is_member("k", "Airi").await.unwrap());

        store.add_member("k", "Airi").await.unwrap();
        assert!(store.is_member("k", "Airi").await.unwrap());
        assert!(!store.is_member("k", "Luna").await.unwrap());
        assert!(!store.is_member("other", "Airi").await.unwrap());
    }

    #[tokio::test]
    async fn delete_key_clears_the_whole_set() {
        let store = InMemoryRotationStore::new();
        store.add_member("k", "Airi").await.unwrap();
        store.add_member("k", "Luna").await.unwrap();
        assert_eq!(store.len("k"), 2);

        store.delete_key("k").await.unwrap();
        assert!(store.is_empty("k"));
        assert!(!store.is_member("k", "Airi").await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_missing_key_is_fine() {
        let store = InMemoryRotationStore::new();
        store.delete_key("missing").await.unwrap();
    }
}
