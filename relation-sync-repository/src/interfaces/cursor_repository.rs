use async_trait::async_trait;

use crate::errors::FeedError;

/// Trait for interacting with the cursor repository.
///
/// Handles the retrieval and persistence of the change log position so that
/// consumption resumes where it stopped after a restart.
#[async_trait]
pub trait CursorRepository: Send + Sync {
    async fn get_cursor(&self, id: &str) -> Result<Option<i64>, FeedError>;
    async fn save_cursor(&self, id: &str, sequence: i64) -> Result<(), FeedError>;
}
