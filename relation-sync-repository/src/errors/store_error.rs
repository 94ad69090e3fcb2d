//! Document store error types.

use std::time::Duration;
use thiserror::Error;

/// Errors from document store operations.
///
/// A failed batch write never leaves a partial result behind, whatever the
/// variant.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database reported an error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A write targeted a document that does not exist.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// The operation did not complete within the configured deadline.
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// A document body could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The store is temporarily unable to serve requests.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create a document not found error for a document path.
    pub fn document_not_found(path: impl Into<String>) -> Self {
        Self::DocumentNotFound(path.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Whether re-applying the same batch later could succeed.
    ///
    /// A missing document or an undecodable body stays that way on redelivery,
    /// so those are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(_) | Self::Timeout(_) | Self::Unavailable(_) => true,
            Self::DocumentNotFound(_) | Self::Serialization(_) => false,
        }
    }
}
