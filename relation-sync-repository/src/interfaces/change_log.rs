use async_trait::async_trait;

use crate::errors::FeedError;
use crate::types::ChangeRecord;

/// Read access to the ordered log of document mutations.
#[async_trait]
pub trait ChangeLogRepository: Send + Sync {
    /// Fetch records with a sequence strictly greater than `after`, in
    /// ascending sequence order.
    ///
    /// `limit` caps the number of distinct sequences returned. A record must
    /// never become visible behind a sequence that was already returned.
    async fn fetch_after(&self, after: i64, limit: usize) -> Result<Vec<ChangeRecord>, FeedError>;
}
