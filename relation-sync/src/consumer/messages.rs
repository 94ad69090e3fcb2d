//! Message types for the consumer.

use relation_sync_repository::ChangeRecord;

/// Messages that flow between the consumer and the orchestrator.
#[derive(Debug)]
pub enum StreamMessage {
    /// A batch of change records, in change log order.
    Events {
        records: Vec<ChangeRecord>,
        /// Sequence of the last record in the batch.
        last_sequence: i64,
    },
    /// Outcome of processing the batch that ended at `last_sequence`.
    Acknowledgment {
        last_sequence: i64,
        success: bool,
        error: Option<String>,
    },
    /// Stream has ended.
    End,
    /// An error occurred.
    Error(String),
}
