//! Change log consumer for relation sync.
//!
//! Polls the change log from the persisted cursor and forwards batches to the
//! orchestrator. The cursor only moves after a positive acknowledgment, so a
//! crash or a rejected batch leads to redelivery rather than loss.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument, warn};

use async_trait::async_trait;
use relation_sync_repository::{ChangeLogRepository, CursorRepository};

use crate::consumer::messages::StreamMessage;
use crate::consumer::Consumer;
use crate::errors::IngestError;

/// Default number of records fetched per poll.
const DEFAULT_BATCH_SIZE: usize = 100;

/// Default delay between polls of an idle change log, in milliseconds.
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// What the consumer does once it has caught up with the change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// Keep polling for new records until shutdown.
    Follow,
    /// Send `End` as soon as a poll comes back empty.
    Drain,
}

/// Consumer over a [`ChangeLogRepository`] with progress kept in a
/// [`CursorRepository`].
pub struct ChangeFeedConsumer {
    change_log: Arc<dyn ChangeLogRepository>,
    cursors: Arc<dyn CursorRepository>,
    cursor_id: String,
    batch_size: usize,
    poll_interval: Duration,
    mode: FeedMode,
}

enum AckOutcome {
    Advanced,
    Rejected,
    Stop,
}

impl ChangeFeedConsumer {
    /// Create a following consumer with default batching.
    pub fn new(
        change_log: Arc<dyn ChangeLogRepository>,
        cursors: Arc<dyn CursorRepository>,
        cursor_id: impl Into<String>,
    ) -> Self {
        Self {
            change_log,
            cursors,
            cursor_id: cursor_id.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            mode: FeedMode::Follow,
        }
    }

    /// Set the maximum number of change log positions per batch.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the delay between polls of an idle or failing change log.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_mode(mut self, mode: FeedMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sleep for one poll interval. Returns `true` if shutdown was signalled.
    async fn pause(&self, shutdown: &mut broadcast::Receiver<()>) -> bool {
        tokio::select! {
            _ = shutdown.recv() => true,
            _ = tokio::time::sleep(self.poll_interval) => false,
        }
    }

    async fn await_acknowledgment(
        &self,
        expected: i64,
        ack_receiver: &mut mpsc::Receiver<StreamMessage>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> AckOutcome {
        loop {
            tokio::select! {
                _ = shutdown.recv() => return AckOutcome::Stop,
                ack = ack_receiver.recv() => match ack {
                    Some(StreamMessage::Acknowledgment { last_sequence, success: true, .. })
                        if last_sequence == expected =>
                    {
                        // Batch fully handled, move the cursor past it
                        if let Err(e) = self.cursors.save_cursor(&self.cursor_id, last_sequence).await {
                            error!(
                                cursor_id = %self.cursor_id,
                                sequence = last_sequence,
                                error = %e,
                                "Failed to persist cursor after acknowledgment"
                            );
                        } else {
                            debug!(cursor_id = %self.cursor_id, sequence = last_sequence, "Advanced cursor");
                        }
                        return AckOutcome::Advanced;
                    }
                    Some(StreamMessage::Acknowledgment { last_sequence, success: false, error })
                        if last_sequence == expected =>
                    {
                        // Keep the cursor where it is so the same batch is fetched again
                        warn!(
                            sequence = last_sequence,
                            error = error.as_deref().unwrap_or("Unknown error"),
                            "Batch rejected, not advancing cursor"
                        );
                        return AckOutcome::Rejected;
                    }
                    Some(StreamMessage::Acknowledgment { last_sequence, .. }) => {
                        warn!(
                            expected = expected,
                            received = last_sequence,
                            "Ignoring acknowledgment for a different batch"
                        );
                    }
                    Some(StreamMessage::End) | None => {
                        info!("Acknowledgment channel closed");
                        return AckOutcome::Stop;
                    }
                    Some(_) => {
                        // Ignore other message types
                    }
                },
            }
        }
    }
}

#[async_trait]
impl Consumer for ChangeFeedConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        info!(
            cursor_id = %self.cursor_id,
            batch_size = self.batch_size,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            mode = ?self.mode,
            "Subscribed to change feed"
        );
        Ok(())
    }

    #[instrument(skip(self, sender, ack_receiver, shutdown), fields(cursor_id = %self.cursor_id))]
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        // Resume from the last acknowledged position
        let mut position = self.cursors.get_cursor(&self.cursor_id).await?.unwrap_or(0);
        info!(sequence = position, "Starting change feed from cursor");

        loop {
            let fetched = tokio::select! {
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal");
                    break;
                }
                fetched = self.change_log.fetch_after(position, self.batch_size) => fetched,
            };

            let records = match fetched {
                Ok(records) => records,
                Err(e) => {
                    // Report and retry after a pause
                    error!(sequence = position, error = %e, "Failed to fetch from change log");
                    let _ = sender.send(StreamMessage::Error(e.to_string())).await;
                    if self.pause(&mut shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            let last_sequence = match records.last() {
                Some(record) => record.sequence,
                None => {
                    // Caught up with the change log
                    if self.mode == FeedMode::Drain {
                        info!(sequence = position, "Change feed drained");
                        break;
                    }
                    if self.pause(&mut shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            debug!(
                record_count = records.len(),
                first_sequence = records[0].sequence,
                last_sequence = last_sequence,
                "Sending batch of change events"
            );
            sender
                .send(StreamMessage::Events {
                    records,
                    last_sequence,
                })
                .await
                .map_err(|e| IngestError::channel(e.to_string()))?;

            // Wait for the orchestrator before fetching the next batch
            match self
                .await_acknowledgment(last_sequence, &mut ack_receiver, &mut shutdown)
                .await
            {
                AckOutcome::Advanced => position = last_sequence,
                AckOutcome::Rejected => {
                    if self.pause(&mut shutdown).await {
                        break;
                    }
                }
                AckOutcome::Stop => break,
            }
        }

        let _ = sender.send(StreamMessage::End).await;
        Ok(())
    }
}
