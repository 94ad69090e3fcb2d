//! Error types for relation sync.

use relation_sync_repository::{FeedError, StoreError};
use thiserror::Error;

/// Why reacting to a single change event failed.
///
/// Unrecognized categories are not errors: they are reported as
/// [`crate::processor::ReactionOutcome::Ignored`].
#[derive(Error, Debug)]
pub enum ReactionError {
    /// A snapshot the reaction needs was absent or empty.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// A snapshot was present but a required field was absent, blank or malformed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The store rejected the derived batch; nothing was written.
    #[error("Store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

impl ReactionError {
    /// Create a missing data error.
    pub fn missing_data(msg: impl Into<String>) -> Self {
        Self::MissingData(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Whether redelivering the event could succeed.
    ///
    /// Only transient store failures qualify; bad or missing data stays bad.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StoreFailure(e) => e.is_retryable(),
            Self::MissingData(_) | Self::ValidationError(_) => false,
        }
    }
}

/// Errors that can occur in the ingest flow.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Change log or cursor error.
    #[error("Feed error: {0}")]
    FeedError(#[from] FeedError),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// One or more events in a batch hit a retryable store failure.
    #[error("Store failure: {0}")]
    StoreFailure(String),

    /// A background task failed to complete.
    #[error("Task error: {0}")]
    TaskError(String),
}

impl IngestError {
    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }

    /// Create a store failure error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreFailure(msg.into())
    }

    /// Create a task error.
    pub fn task(msg: impl Into<String>) -> Self {
        Self::TaskError(msg.into())
    }
}
