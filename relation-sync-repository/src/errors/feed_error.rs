use thiserror::Error;

/// Errors from the change log and the cursor that tracks it.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A change log row could not be turned into a change event.
    #[error("Malformed change record {sequence}: {reason}")]
    MalformedRecord { sequence: i64, reason: String },
}

impl FeedError {
    pub fn malformed(sequence: i64, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            sequence,
            reason: reason.into(),
        }
    }
}
