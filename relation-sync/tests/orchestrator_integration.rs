//! Integration tests for the relation sync orchestrator.
//!
//! These tests use the real Orchestrator with in-memory repositories and
//! either a mock consumer or the real change feed consumer.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;

use relation_sync::consumer::{ChangeFeedConsumer, FeedMode, StreamMessage};
use relation_sync::errors::IngestError;
use relation_sync::loader::WriteApplier;
use relation_sync::orchestrator::{Consumer, Orchestrator, OrchestratorConfig};
use relation_sync::processor::ReactionDispatcher;
use relation_sync_repository::{
    ChangeRecord, InMemoryChangeLog, InMemoryCursorRepository, InMemoryDocumentStore,
};
use relation_sync_shared::{ChangeEvent, DocumentKey};
use serde_json::{json, Value};

// Mock Consumer for testing
struct MockConsumer {
    batches: Vec<Vec<ChangeRecord>>,
    acks: Arc<Mutex<Vec<(i64, bool)>>>,
    error_on_subscribe: bool,
}

impl MockConsumer {
    fn new(batches: Vec<Vec<ChangeRecord>>) -> Self {
        Self {
            batches,
            acks: Arc::new(Mutex::new(Vec::new())),
            error_on_subscribe: false,
        }
    }

    fn acks(&self) -> Vec<(i64, bool)> {
        self.acks.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Consumer for MockConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        if self.error_on_subscribe {
            Err(IngestError::channel("Mock subscribe error"))
        } else {
            Ok(())
        }
    }

    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        for records in &self.batches {
            let last_sequence = records.last().map_or(0, |r| r.sequence);
            sender
                .send(StreamMessage::Events {
                    records: records.clone(),
                    last_sequence,
                })
                .await
                .map_err(|e| IngestError::channel(e.to_string()))?;

            tokio::select! {
                _ = shutdown.recv() => break,
                ack = ack_receiver.recv() => match ack {
                    Some(StreamMessage::Acknowledgment { last_sequence, success, .. }) => {
                        self.acks.lock().unwrap().push((last_sequence, success));
                    }
                    _ => break,
                },
            }
        }

        let _ = sender.send(StreamMessage::End).await;
        Ok(())
    }
}

fn seeded_store() -> Arc<InMemoryDocumentStore> {
    Arc::new(InMemoryDocumentStore::with_documents([
        (DocumentKey::user_profile("u1"), json!({})),
        (DocumentKey::user_profile("u2"), json!({})),
        (DocumentKey::group("g1"), json!({ "ownerId": "u1", "memberIds": ["u1"] })),
    ]))
}

fn dispatcher(store: Arc<InMemoryDocumentStore>) -> Arc<ReactionDispatcher> {
    Arc::new(ReactionDispatcher::new(Arc::new(WriteApplier::new(store))))
}

fn accepted(fields: Value) -> ChangeEvent {
    let mut before = fields.clone();
    before["status"] = json!("pending");
    let mut after = fields;
    after["status"] = json!("accepted");
    ChangeEvent::updated("notifications", "n", before, after)
}

fn scenario_events() -> Vec<ChangeEvent> {
    vec![
        ChangeEvent::created("groups", "g1", json!({ "ownerId": "u1", "memberIds": ["u1"] })),
        accepted(json!({ "type": "friend", "sendUserId": "u1", "receiveUserId": "u2" })),
        accepted(json!({ "type": "groupInvitation", "receiveUserId": "u2", "groupId": "g1" })),
        accepted(json!({ "type": "comment", "sendUserId": "u2", "receiveUserId": "u1" })),
    ]
}

fn records(events: Vec<ChangeEvent>) -> Vec<ChangeRecord> {
    events
        .into_iter()
        .enumerate()
        .map(|(i, event)| ChangeRecord::new(i as i64 + 1, event))
        .collect()
}

fn assert_scenarios_applied(store: &InMemoryDocumentStore) {
    let u1 = store.document(&DocumentKey::user_profile("u1")).unwrap();
    let u2 = store.document(&DocumentKey::user_profile("u2")).unwrap();
    let g1 = store.document(&DocumentKey::group("g1")).unwrap();

    assert_eq!(u1["groups"], json!(["g1"]));
    assert_eq!(u1["friends"], json!(["u2"]));
    assert_eq!(u2["friends"], json!(["u1"]));
    assert_eq!(u2["groups"], json!(["g1"]));
    assert_eq!(g1["memberIds"], json!(["u1", "u2"]));
}

#[tokio::test]
async fn test_orchestrator_applies_batch_and_acknowledges() {
    let store = seeded_store();
    let consumer = Arc::new(MockConsumer::new(vec![records(scenario_events())]));
    let mut orchestrator = Orchestrator::new(consumer.clone(), dispatcher(store.clone()));

    let result = timeout(Duration::from_secs(5), orchestrator.run()).await;
    assert!(result.is_ok(), "orchestrator did not finish in time");
    assert!(result.unwrap().is_ok());

    assert_scenarios_applied(&store);
    assert_eq!(consumer.acks(), vec![(4, true)]);

    let stats = orchestrator.stats().snapshot();
    assert_eq!(stats.events_processed, 4);
    assert_eq!(stats.writes_applied, 5);
    assert_eq!(stats.events_ignored, 1);
    assert_eq!(stats.batches_acknowledged, 1);
}

#[tokio::test]
async fn test_redelivered_batch_is_idempotent() {
    let store = seeded_store();
    let batch = records(scenario_events());
    let consumer = Arc::new(MockConsumer::new(vec![batch.clone(), batch]));
    let mut orchestrator = Orchestrator::with_config(
        consumer.clone(),
        dispatcher(store.clone()),
        OrchestratorConfig {
            concurrency: 1,
            ..OrchestratorConfig::default()
        },
    );

    timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .expect("orchestrator timed out")
        .unwrap();

    assert_scenarios_applied(&store);
    assert_eq!(consumer.acks(), vec![(4, true), (4, true)]);
}

#[tokio::test]
async fn test_terminal_failures_do_not_block_the_batch() {
    let store = seeded_store();
    let events = vec![
        // Missing groupId: validation error.
        accepted(json!({ "type": "groupInvitation", "receiveUserId": "u2" })),
        // Profile u9 does not exist: non-retryable store failure.
        accepted(json!({ "type": "friend", "sendUserId": "u1", "receiveUserId": "u9" })),
        accepted(json!({ "type": "friend", "sendUserId": "u1", "receiveUserId": "u2" })),
    ];
    let consumer = Arc::new(MockConsumer::new(vec![records(events)]));
    let mut orchestrator = Orchestrator::new(consumer.clone(), dispatcher(store.clone()));

    timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .expect("orchestrator timed out")
        .unwrap();

    assert_eq!(consumer.acks(), vec![(3, true)]);
    let u1 = store.document(&DocumentKey::user_profile("u1")).unwrap();
    assert_eq!(u1["friends"], json!(["u2"]));
    assert!(store.document(&DocumentKey::user_profile("u2")).unwrap().get("groups").is_none());

    let stats = orchestrator.stats().snapshot();
    assert_eq!(stats.events_failed, 2);
    assert_eq!(stats.writes_applied, 2);
}

#[tokio::test]
async fn test_retryable_failure_rejects_batch() {
    let store = seeded_store();
    store.fail_next_batches(1);
    let events = vec![accepted(
        json!({ "type": "friend", "sendUserId": "u1", "receiveUserId": "u2" }),
    )];
    let consumer = Arc::new(MockConsumer::new(vec![records(events)]));
    let mut orchestrator = Orchestrator::new(consumer.clone(), dispatcher(store.clone()));

    timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .expect("orchestrator timed out")
        .unwrap();

    assert_eq!(consumer.acks(), vec![(1, false)]);
    assert_eq!(orchestrator.stats().snapshot().batches_rejected, 1);
    assert!(store.document(&DocumentKey::user_profile("u1")).unwrap().get("friends").is_none());
}

#[tokio::test]
async fn test_subscribe_error_stops_orchestrator() {
    let store = seeded_store();
    let mut consumer = MockConsumer::new(vec![]);
    consumer.error_on_subscribe = true;
    let mut orchestrator = Orchestrator::new(Arc::new(consumer), dispatcher(store));

    let result = timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .expect("orchestrator timed out");
    assert!(matches!(result, Err(IngestError::ChannelError(_))));
}

// ============================================================================
// Change feed consumer end to end
// ============================================================================

#[tokio::test]
async fn test_change_feed_redelivers_after_rejection_and_advances_cursor() {
    let store = seeded_store();
    store.fail_next_batches(1);

    let change_log = Arc::new(InMemoryChangeLog::new());
    for event in scenario_events() {
        change_log.append(event);
    }
    let cursors = Arc::new(InMemoryCursorRepository::new());

    let consumer = ChangeFeedConsumer::new(change_log.clone(), cursors.clone(), "relation-sync")
        .with_batch_size(10)
        .with_poll_interval(Duration::from_millis(10))
        .with_mode(FeedMode::Drain);
    let mut orchestrator = Orchestrator::with_config(
        Arc::new(consumer),
        dispatcher(store.clone()),
        OrchestratorConfig {
            concurrency: 1,
            ..OrchestratorConfig::default()
        },
    );

    timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .expect("orchestrator timed out")
        .unwrap();

    assert_scenarios_applied(&store);
    assert_eq!(cursors.cursor("relation-sync"), Some(4));

    let stats = orchestrator.stats().snapshot();
    assert_eq!(stats.batches_rejected, 1);
    assert_eq!(stats.batches_acknowledged, 1);
}

#[tokio::test]
async fn test_change_feed_resumes_from_cursor() {
    let store = seeded_store();
    let change_log = Arc::new(InMemoryChangeLog::new());
    for event in scenario_events() {
        change_log.append(event);
    }
    let cursors = Arc::new(InMemoryCursorRepository::new());
    // Everything up to the friend acceptance was handled by a previous run.
    relation_sync_repository::CursorRepository::save_cursor(cursors.as_ref(), "relation-sync", 2)
        .await
        .unwrap();

    let consumer = ChangeFeedConsumer::new(change_log, cursors.clone(), "relation-sync")
        .with_batch_size(1)
        .with_mode(FeedMode::Drain);
    let mut orchestrator = Orchestrator::new(Arc::new(consumer), dispatcher(store.clone()));

    timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .expect("orchestrator timed out")
        .unwrap();

    assert_eq!(cursors.cursor("relation-sync"), Some(4));
    let u1 = store.document(&DocumentKey::user_profile("u1")).unwrap();
    assert!(u1.get("groups").is_none());
    assert!(u1.get("friends").is_none());
    assert_eq!(
        store.document(&DocumentKey::group("g1")).unwrap()["memberIds"],
        json!(["u1", "u2"])
    );
    assert_eq!(orchestrator.stats().snapshot().batches_acknowledged, 2);
}

#[tokio::test]
async fn test_start_and_stop_following_consumer() {
    let store = seeded_store();
    let change_log = Arc::new(InMemoryChangeLog::new());
    let cursors = Arc::new(InMemoryCursorRepository::new());
    let consumer = ChangeFeedConsumer::new(change_log.clone(), cursors.clone(), "relation-sync")
        .with_poll_interval(Duration::from_millis(10));

    let running = Orchestrator::new(Arc::new(consumer), dispatcher(store.clone())).start();

    change_log.append(ChangeEvent::created("groups", "g1", json!({ "ownerId": "u1" })));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while cursors.cursor("relation-sync") != Some(1) {
        assert!(tokio::time::Instant::now() < deadline, "event was not processed in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!running.is_finished());
    assert_eq!(running.stats().writes_applied, 1);

    timeout(Duration::from_secs(5), running.stop())
        .await
        .expect("orchestrator did not stop in time")
        .unwrap();

    let u1 = store.document(&DocumentKey::user_profile("u1")).unwrap();
    assert_eq!(u1["groups"], json!(["g1"]));
}

#[tokio::test]
async fn test_started_orchestrator_reacts_to_batch_concurrently() {
    let store = seeded_store();
    let consumer = Arc::new(MockConsumer::new(vec![records(scenario_events())]));
    let config = OrchestratorConfig {
        concurrency: 4,
        ..Default::default()
    };

    let running = Orchestrator::with_config(consumer.clone(), dispatcher(store.clone()), config).start();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !running.is_finished() {
        assert!(tokio::time::Instant::now() < deadline, "orchestrator did not finish in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let stats = running.stats();
    running.stop().await.unwrap();

    assert_eq!(consumer.acks(), vec![(4, true)]);
    assert_eq!(stats.events_processed, 4);
    assert_eq!(stats.events_ignored, 1);
    assert_scenarios_applied(&store);
}
