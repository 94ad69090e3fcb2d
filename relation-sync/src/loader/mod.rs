//! Loader module for relation sync.
//!
//! Applies the writes derived for one event to the document store as a
//! single atomic batch.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use relation_sync_repository::{DocumentStore, StoreError};
use relation_sync_shared::WriteBatch;

/// Default deadline for one batch write.
const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 10;

/// Configuration for the write applier.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Deadline for a single batch write. `None` leaves timeouts to the store.
    pub write_timeout: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            write_timeout: Some(Duration::from_secs(DEFAULT_WRITE_TIMEOUT_SECS)),
        }
    }
}

/// Applies write batches through the store's atomic batch primitive.
///
/// The applier never retries. A timed-out batch is reported as failed; since
/// every entry is a set-union, applying it again on redelivery is safe even if
/// the store did commit it.
pub struct WriteApplier {
    store: Arc<dyn DocumentStore>,
    config: LoaderConfig,
}

impl WriteApplier {
    /// Create a new write applier with the given store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_config(store, LoaderConfig::default())
    }

    /// Create a new write applier with custom configuration.
    pub fn with_config(store: Arc<dyn DocumentStore>, config: LoaderConfig) -> Self {
        Self { store, config }
    }

    /// The store writes are applied to.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Apply `batch` all-or-nothing and return the number of writes committed.
    ///
    /// An empty batch returns immediately without reaching the store.
    #[instrument(skip(self, batch), fields(write_count = batch.len()))]
    pub async fn apply(&self, batch: &WriteBatch) -> Result<usize, StoreError> {
        if batch.is_empty() {
            debug!("No writes to apply");
            return Ok(0);
        }

        // Use the store's atomic batch primitive, bounded by the configured deadline
        let write = self.store.batch_write(batch.as_slice());
        let result = match self.config.write_timeout {
            Some(limit) => match tokio::time::timeout(limit, write).await {
                Ok(result) => result,
                Err(_) => {
                    // The store may or may not have committed; redelivery is safe either way
                    warn!(timeout_ms = limit.as_millis() as u64, "Batch write timed out");
                    Err(StoreError::Timeout(limit))
                }
            },
            None => write.await,
        };

        result?;
        debug!("Applied write batch");
        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relation_sync_repository::InMemoryDocumentStore;
    use relation_sync_shared::{DocumentKey, SetField, UnionWrite};
    use serde_json::{json, Value};

    struct StalledStore;

    #[async_trait]
    impl DocumentStore for StalledStore {
        async fn get(&self, _key: &DocumentKey) -> Result<Option<Value>, StoreError> {
            Ok(None)
        }

        async fn batch_write(&self, _writes: &[UnionWrite]) -> Result<(), StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_empty_batch_skips_store() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let applier = WriteApplier::new(store.clone());

        assert_eq!(applier.apply(&WriteBatch::new()).await.unwrap(), 0);
        assert_eq!(store.batch_count(), 0);
    }

    #[tokio::test]
    async fn test_apply_commits_batch() {
        let store = Arc::new(InMemoryDocumentStore::with_documents([(
            DocumentKey::user_profile("u1"),
            json!({}),
        )]));
        let applier = WriteApplier::new(store.clone());
        let batch: WriteBatch =
            [UnionWrite::new(DocumentKey::user_profile("u1"), SetField::Groups, "g1")]
                .into_iter()
                .collect();

        assert_eq!(applier.apply(&batch).await.unwrap(), 1);
        assert_eq!(
            store.document(&DocumentKey::user_profile("u1")).unwrap()["groups"],
            json!(["g1"])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_store_failure() {
        let applier = WriteApplier::with_config(
            Arc::new(StalledStore),
            LoaderConfig {
                write_timeout: Some(Duration::from_secs(10)),
            },
        );
        let batch: WriteBatch =
            [UnionWrite::new(DocumentKey::user_profile("u1"), SetField::Groups, "g1")]
                .into_iter()
                .collect();

        let result = applier.apply(&batch).await;
        assert!(matches!(result, Err(StoreError::Timeout(d)) if d == Duration::from_secs(10)));
    }
}
