use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::FeedError;
use crate::CursorRepository;

/// Cursor repository held in process memory.
#[derive(Default)]
pub struct InMemoryCursorRepository {
    cursors: Mutex<HashMap<String, i64>>,
}

impl InMemoryCursorRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cursor for `id`, without going through the async trait.
    pub fn cursor(&self, id: &str) -> Option<i64> {
        self.cursors.lock().ok().and_then(|c| c.get(id).copied())
    }
}

#[async_trait]
impl CursorRepository for InMemoryCursorRepository {
    async fn get_cursor(&self, id: &str) -> Result<Option<i64>, FeedError> {
        Ok(self.cursor(id))
    }

    async fn save_cursor(&self, id: &str, sequence: i64) -> Result<(), FeedError> {
        let mut cursors = match self.cursors.lock() {
            Ok(cursors) => cursors,
            Err(poisoned) => poisoned.into_inner(),
        };
        cursors.insert(id.to_string(), sequence);
        Ok(())
    }
}
