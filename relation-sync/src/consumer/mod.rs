//! Consumer module for relation sync.
//!
//! Provides the change feed consumer and the trait the orchestrator drives
//! consumers through.

mod change_feed_consumer;
mod messages;

pub use change_feed_consumer::{ChangeFeedConsumer, FeedMode};
pub use messages::StreamMessage;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::errors::IngestError;

/// A source of change event batches.
///
/// A consumer sends [`StreamMessage::Events`] on `sender`, waits for the
/// matching [`StreamMessage::Acknowledgment`] on `ack_receiver` and only then
/// records progress. It sends [`StreamMessage::End`] before returning.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Prepare the consumer before `run` is called.
    fn subscribe(&self) -> Result<(), IngestError>;

    /// Consume until the feed ends, the acknowledgment channel closes or a
    /// shutdown signal arrives.
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        ack_receiver: mpsc::Receiver<StreamMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError>;
}
