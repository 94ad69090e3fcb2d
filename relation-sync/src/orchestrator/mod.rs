//! Orchestrator module for relation sync.
//!
//! Coordinates the consumer, dispatcher and loader, acknowledges batches and
//! handles shutdown.

use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, instrument, warn};

pub use crate::consumer::Consumer;
use crate::consumer::StreamMessage;
use crate::errors::IngestError;
use crate::processor::{ReactionDispatcher, ReactionOutcome};
use relation_sync_repository::ChangeRecord;

/// Default number of events reacted to concurrently within a batch.
const DEFAULT_CONCURRENCY: usize = 16;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the message channel buffer.
    pub channel_buffer_size: usize,
    /// Maximum number of events of one batch in flight at once.
    pub concurrency: usize,
    /// How often progress is logged.
    pub progress_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 1000,
            concurrency: DEFAULT_CONCURRENCY,
            progress_interval: Duration::from_secs(10),
        }
    }
}

/// Counters kept since startup.
#[derive(Debug, Default)]
pub struct SyncStats {
    events_processed: AtomicU64,
    writes_applied: AtomicU64,
    events_ignored: AtomicU64,
    events_failed: AtomicU64,
    batches_acknowledged: AtomicU64,
    batches_rejected: AtomicU64,
}

/// Point-in-time copy of [`SyncStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatsSnapshot {
    pub events_processed: u64,
    pub writes_applied: u64,
    pub events_ignored: u64,
    /// Events that failed terminally or hit a store failure.
    pub events_failed: u64,
    pub batches_acknowledged: u64,
    pub batches_rejected: u64,
}

impl SyncStats {
    pub fn snapshot(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            events_processed: self.events_processed.load(Ordering::Relaxed),
            writes_applied: self.writes_applied.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
            events_failed: self.events_failed.load(Ordering::Relaxed),
            batches_acknowledged: self.batches_acknowledged.load(Ordering::Relaxed),
            batches_rejected: self.batches_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Orchestrator that coordinates the sync components.
///
/// Each batch from the consumer is reacted to event by event, with up to
/// `concurrency` events in flight. The batch is acknowledged once every event
/// has finished, unless one of them hit a retryable store failure, in which
/// case it is rejected and the consumer redelivers it.
pub struct Orchestrator {
    consumer: Arc<dyn Consumer>,
    dispatcher: Arc<ReactionDispatcher>,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
    /// Subscribed at construction so a shutdown sent before `run` is not lost.
    shutdown_rx: Option<broadcast::Receiver<()>>,
    stats: Arc<SyncStats>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(consumer: Arc<dyn Consumer>, dispatcher: Arc<ReactionDispatcher>) -> Self {
        Self::with_config(consumer, dispatcher, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        consumer: Arc<dyn Consumer>,
        dispatcher: Arc<ReactionDispatcher>,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Self {
            consumer,
            dispatcher,
            config,
            shutdown_tx,
            shutdown_rx: Some(shutdown_rx),
            stats: Arc::new(SyncStats::default()),
        }
    }

    /// Shared handle to the counters.
    pub fn stats(&self) -> Arc<SyncStats> {
        Arc::clone(&self.stats)
    }

    /// Run the orchestrator.
    ///
    /// Blocks until the consumer ends, a shutdown is triggered or the process
    /// receives Ctrl-C.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), IngestError> {
        info!("Starting relation sync orchestrator");

        // Subscribe to the change feed
        self.consumer.subscribe()?;

        // Create event channel
        let (event_transmitter, mut event_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);
        // Create acknowledgment channel
        let (ack_transmitter, ack_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        let consumer = Arc::clone(&self.consumer);
        let consumer_shutdown = self.shutdown_tx.subscribe();
        let mut shutdown_rx = match self.shutdown_rx.take() {
            Some(rx) => rx,
            None => self.shutdown_tx.subscribe(),
        };

        // Start consumer in background
        let consumer_handle = tokio::spawn(async move {
            if let Err(e) = consumer
                .run(event_transmitter, ack_receiver, consumer_shutdown)
                .await
            {
                error!(error = %e, "Consumer error");
            }
        });

        info!("Ready to process change events");

        // Set up progress logging timer
        let mut progress_timer = interval(self.config.progress_interval);
        progress_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Track previous values for rate calculation
        let mut prev_events: u64 = 0;
        let mut prev_time = std::time::Instant::now();

        loop {
            tokio::select! {
                msg = event_receiver.recv() => {
                    match msg {
                        Some(StreamMessage::Events { records, last_sequence }) => {
                            info!(
                                event_count = records.len(),
                                last_sequence = last_sequence,
                                "Received change events from consumer"
                            );
                            let ack = match self.process_batch(records).await {
                                Ok(()) => {
                                    // Send success acknowledgment
                                    self.stats.batches_acknowledged.fetch_add(1, Ordering::Relaxed);
                                    StreamMessage::Acknowledgment { last_sequence, success: true, error: None }
                                }
                                Err(e) => {
                                    // Send failure acknowledgment so the batch is redelivered
                                    error!(error = %e, last_sequence = last_sequence, "Failed to process batch. Sending NACK to consumer");
                                    self.stats.batches_rejected.fetch_add(1, Ordering::Relaxed);
                                    StreamMessage::Acknowledgment { last_sequence, success: false, error: Some(e.to_string()) }
                                }
                            };
                            if ack_transmitter.send(ack).await.is_err() {
                                warn!("Consumer stopped listening for acknowledgments");
                            }
                        }
                        Some(StreamMessage::Error(e)) => {
                            error!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Consumer stream ended");
                            break;
                        }
                        Some(StreamMessage::Acknowledgment { .. }) => {
                            // Ignore acknowledgments received on the wrong channel
                            warn!("Received acknowledgment on event channel (should be on ack channel)");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
                _ = progress_timer.tick() => {
                    let stats = self.stats.snapshot();

                    // Calculate rate per second
                    let now = std::time::Instant::now();
                    let elapsed_secs = now.duration_since(prev_time).as_secs_f64();
                    let events_per_sec = if elapsed_secs > 0.0 {
                        (stats.events_processed.saturating_sub(prev_events) as f64) / elapsed_secs
                    } else {
                        0.0
                    };

                    info!(
                        events_processed = stats.events_processed,
                        writes_applied = stats.writes_applied,
                        events_failed = stats.events_failed,
                        events_per_sec = format!("{:.2}", events_per_sec),
                        "Processing progress"
                    );

                    // Update previous values for next calculation
                    prev_events = stats.events_processed;
                    prev_time = now;
                }
            }
        }

        // Release a consumer that is still polling or waiting for an acknowledgment.
        let _ = self.shutdown_tx.send(());
        drop(ack_transmitter);

        // Wait for consumer to finish
        if let Err(e) = consumer_handle.await {
            error!(error = %e, "Consumer task failed");
        }

        let stats = self.stats.snapshot();
        info!(
            total_events_processed = stats.events_processed,
            total_writes_applied = stats.writes_applied,
            total_events_failed = stats.events_failed,
            "Orchestrator shutdown complete"
        );
        Ok(())
    }

    /// React to every event of a batch.
    ///
    /// Returns an error only when at least one event hit a retryable store
    /// failure. Terminal failures are logged by the dispatcher and counted.
    async fn process_batch(&self, records: Vec<ChangeRecord>) -> Result<(), IngestError> {
        debug!(event_count = records.len(), "Processing batch of change events");

        // React to up to `concurrency` events at once
        let results: Vec<_> = stream::iter(records)
            .map(|record| {
                let dispatcher = Arc::clone(&self.dispatcher);
                async move {
                    let result = dispatcher.dispatch(&record.event).await;
                    (record.sequence, result)
                }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        self.stats
            .events_processed
            .fetch_add(results.len() as u64, Ordering::Relaxed);

        // Only retryable store failures hold the batch back
        let mut retryable = Vec::new();
        for (sequence, result) in results {
            match result {
                Ok(ReactionOutcome::Applied(batch)) => {
                    self.stats
                        .writes_applied
                        .fetch_add(batch.len() as u64, Ordering::Relaxed);
                }
                Ok(ReactionOutcome::Ignored(_)) => {
                    self.stats.events_ignored.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.stats.events_failed.fetch_add(1, Ordering::Relaxed);
                    if e.is_retryable() {
                        retryable.push((sequence, e));
                    }
                }
            }
        }

        match retryable.iter().min_by_key(|(sequence, _)| *sequence) {
            None => Ok(()),
            Some((sequence, e)) => Err(IngestError::store(format!(
                "{} event(s) need redelivery, first at sequence {}: {}",
                retryable.len(),
                sequence,
                e
            ))),
        }
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run the orchestrator on a background task.
    pub fn start(mut self) -> RunningOrchestrator {
        let shutdown_tx = self.shutdown_tx.clone();
        let stats = self.stats();
        let handle = tokio::spawn(async move { self.run().await });

        RunningOrchestrator {
            handle,
            shutdown_tx,
            stats,
        }
    }
}

/// Handle to an orchestrator started with [`Orchestrator::start`].
pub struct RunningOrchestrator {
    handle: JoinHandle<Result<(), IngestError>>,
    shutdown_tx: broadcast::Sender<()>,
    stats: Arc<SyncStats>,
}

impl RunningOrchestrator {
    pub fn stats(&self) -> SyncStatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether the orchestrator has already stopped on its own.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal shutdown and wait for the orchestrator to finish.
    pub async fn stop(self) -> Result<(), IngestError> {
        let _ = self.shutdown_tx.send(());
        self.handle
            .await
            .map_err(|e| IngestError::task(e.to_string()))?
    }
}
