use async_trait::async_trait;
use relation_sync_shared::{DocumentKey, UnionWrite};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::errors::StoreError;
use crate::DocumentStore;

/// Document store held in process memory.
///
/// Supports injecting failures with [`InMemoryDocumentStore::fail_next_batches`]
/// to exercise the all-or-nothing path.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<DocumentKey, Value>>,
    pending_failures: AtomicUsize,
    committed_batches: AtomicUsize,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with documents.
    pub fn with_documents(documents: impl IntoIterator<Item = (DocumentKey, Value)>) -> Self {
        Self {
            documents: RwLock::new(documents.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Create or replace a document body.
    pub fn insert_document(&self, key: DocumentKey, data: Value) -> Result<(), StoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| StoreError::unavailable("document map lock poisoned"))?;
        documents.insert(key, data);
        Ok(())
    }

    /// Snapshot of a document body, if present.
    pub fn document(&self, key: &DocumentKey) -> Option<Value> {
        self.documents
            .read()
            .ok()
            .and_then(|documents| documents.get(key).cloned())
    }

    /// Reject the next `count` batch writes with [`StoreError::Unavailable`].
    pub fn fail_next_batches(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Number of batches that were committed.
    pub fn batch_count(&self) -> usize {
        self.committed_batches.load(Ordering::SeqCst)
    }

    fn take_injected_failure(&self) -> bool {
        self.pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn apply_union(data: &mut Value, write: &UnionWrite) -> Result<(), StoreError> {
    let body = data.as_object_mut().ok_or_else(|| {
        StoreError::serialization(format!("{} is not a JSON object", write.key.path()))
    })?;

    let entry = body
        .entry(write.field.as_str())
        .or_insert_with(|| Value::Array(Vec::new()));
    if entry.is_null() {
        *entry = Value::Array(Vec::new());
    }

    let set = entry.as_array_mut().ok_or_else(|| {
        StoreError::serialization(format!(
            "{}.{} is not an array",
            write.key.path(),
            write.field
        ))
    })?;

    if !set.iter().any(|v| v.as_str() == Some(write.value.as_str())) {
        set.push(Value::String(write.value.clone()));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, key: &DocumentKey) -> Result<Option<Value>, StoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| StoreError::unavailable("document map lock poisoned"))?;
        Ok(documents.get(key).cloned())
    }

    async fn batch_write(&self, writes: &[UnionWrite]) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }
        if self.take_injected_failure() {
            return Err(StoreError::unavailable("injected batch failure"));
        }

        let mut documents = self
            .documents
            .write()
            .map_err(|_| StoreError::unavailable("document map lock poisoned"))?;

        // Stage every write on copies so a failing entry leaves nothing behind.
        let mut staged: HashMap<DocumentKey, Value> = HashMap::new();
        for write in writes {
            if !staged.contains_key(&write.key) {
                let current = documents
                    .get(&write.key)
                    .cloned()
                    .ok_or_else(|| StoreError::document_not_found(write.key.path()))?;
                staged.insert(write.key.clone(), current);
            }
            if let Some(data) = staged.get_mut(&write.key) {
                apply_union(data, write)?;
            }
        }

        documents.extend(staged);
        self.committed_batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relation_sync_shared::SetField;
    use serde_json::json;

    #[test]
    fn test_apply_union_creates_missing_field() {
        let mut data = json!({ "displayName": "Ann" });
        let write = UnionWrite::new(DocumentKey::user_profile("u1"), SetField::Groups, "g1");

        apply_union(&mut data, &write).unwrap();
        apply_union(&mut data, &write).unwrap();

        assert_eq!(data["groups"], json!(["g1"]));
    }

    #[test]
    fn test_apply_union_treats_null_field_as_empty() {
        let mut data = json!({ "groups": null });
        let write = UnionWrite::new(DocumentKey::user_profile("u1"), SetField::Groups, "g1");

        apply_union(&mut data, &write).unwrap();

        assert_eq!(data["groups"], json!(["g1"]));
    }

    #[test]
    fn test_apply_union_rejects_non_array_field() {
        let mut data = json!({ "groups": "g0" });
        let write = UnionWrite::new(DocumentKey::user_profile("u1"), SetField::Groups, "g1");

        assert!(matches!(
            apply_union(&mut data, &write),
            Err(StoreError::Serialization(_))
        ));
    }
}
