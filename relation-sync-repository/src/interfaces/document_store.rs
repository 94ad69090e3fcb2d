//! Document store trait definition.

use async_trait::async_trait;
use relation_sync_shared::{DocumentKey, UnionWrite};
use serde_json::Value;

use crate::errors::StoreError;

/// Abstracts the document database that holds groups, notifications and
/// user profiles.
///
/// Implementations are injected into the write applier so the service can run
/// against PostgreSQL in production and an in-memory store in tests.
///
/// # Write semantics
///
/// `batch_write` is a conditional update: every targeted document must already
/// exist. If any entry cannot be applied, no entry is applied.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the current body of a document, or `None` if it does not exist.
    async fn get(&self, key: &DocumentKey) -> Result<Option<Value>, StoreError>;

    /// Apply every set-union write atomically.
    ///
    /// Inserting a value that is already in the set is a no-op for that entry,
    /// so re-applying a batch leaves the store unchanged.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If all writes were applied
    /// * `Err(StoreError)` - If the batch was rejected; nothing was written
    async fn batch_write(&self, writes: &[UnionWrite]) -> Result<(), StoreError>;
}
