//! Rotation state storage.
//!
//! Which default personas a user has already received in the current
//! rotation cycle lives outside the process, in a key/value set store, so
//! it survives across independent request-handling invocations. The core
//! only needs three set operations; everything else about the store is the
//! host's business.

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryRotationStore;
pub use sqlite::SqliteRotationStore;

/// Key prefix for per-user used-persona sets.
pub const USED_SET_PREFIX: &str = "character:used:";

/// Derive the used-set key for a user.
pub fn used_set_key(user_id: i64) -> String {
    format!("{USED_SET_PREFIX}{user_id}")
}

/// Errors surfaced by a rotation store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached at all.
    #[error("rotation store unavailable: {message}")]
    Unavailable { message: String },

    /// The store was reached but the operation failed.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Set-membership store tracking issued persona names per user.
///
/// Implementations must be safe to share across concurrent callers; the
/// manager holds them behind `Arc`. Errors are surfaced, not retried —
/// the manager applies its fail-open policy on top.
#[async_trait]
pub trait RotationStore: Send + Sync {
    /// Is `value` already a member of the set at `set_key`?
    async fn is_member(&self, set_key: &str, value: &str) -> Result<bool, StoreError>;

    /// Add `value` to the set at `set_key`, creating the set if needed.
    async fn add_member(&self, set_key: &str, value: &str) -> Result<(), StoreError>;

    /// Drop the whole set at `set_key`. Deleting a missing key is not an
    /// error.
    async fn delete_key(&self, set_key: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_set_key_is_deterministic() {
        assert_eq!(used_set_key(87), "character:used:87");
        assert_eq!(used_set_key(87), used_set_key(87));
    }
}
