use async_trait::async_trait;
use relation_sync_shared::ChangeEvent;
use std::sync::Mutex;

use crate::errors::FeedError;
use crate::types::ChangeRecord;
use crate::ChangeLogRepository;

/// Change log held in process memory.
#[derive(Default)]
pub struct InMemoryChangeLog {
    records: Mutex<Vec<ChangeRecord>>,
}

impl InMemoryChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return the sequence assigned to it.
    pub fn append(&self, event: ChangeEvent) -> i64 {
        let mut records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        let sequence = records.last().map_or(1, |r| r.sequence + 1);
        records.push(ChangeRecord::new(sequence, event));
        sequence
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ChangeLogRepository for InMemoryChangeLog {
    async fn fetch_after(&self, after: i64, limit: usize) -> Result<Vec<ChangeRecord>, FeedError> {
        let records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(records
            .iter()
            .filter(|r| r.sequence > after)
            .take(limit)
            .cloned()
            .collect())
    }
}
