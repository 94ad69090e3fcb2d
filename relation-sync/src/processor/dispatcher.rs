//! Routes change events to the reactor that handles them.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use relation_sync_shared::{ChangeEvent, ChangeKind, Collection, SetField, WriteBatch};

use crate::errors::ReactionError;
use crate::loader::WriteApplier;
use crate::processor::group_reactor::GroupCreationReactor;
use crate::processor::notification_reactor::NotificationTransitionReactor;
use crate::processor::outcome::{ChangeCategory, Derivation, IgnoreReason, ReactionOutcome};

/// Classifies each change event, runs exactly one reactor for it and applies
/// the derived batch.
///
/// Holds no mutable state, so one instance can serve any number of events
/// concurrently.
pub struct ReactionDispatcher {
    groups: GroupCreationReactor,
    notifications: NotificationTransitionReactor,
    applier: Arc<WriteApplier>,
}

impl ReactionDispatcher {
    pub fn new(applier: Arc<WriteApplier>) -> Self {
        Self {
            groups: GroupCreationReactor::new(),
            notifications: NotificationTransitionReactor::new(),
            applier,
        }
    }

    /// Classify an event by the reaction it calls for.
    pub fn classify(event: &ChangeEvent) -> ChangeCategory<'_> {
        match (event.known_collection(), event.kind) {
            (Some(Collection::Groups), ChangeKind::Created) => ChangeCategory::GroupCreated {
                group_id: &event.document_id,
                snapshot: event.after_snapshot(),
            },
            (Some(Collection::Notifications), ChangeKind::Updated) => {
                ChangeCategory::NotificationUpdated {
                    notification_id: &event.document_id,
                    before: event.before_snapshot(),
                    after: event.after_snapshot(),
                }
            }
            _ => ChangeCategory::OutOfScope {
                collection: &event.collection,
                kind: event.kind,
            },
        }
    }

    /// Derive the writes for a classified event without applying them.
    pub fn derive(&self, category: ChangeCategory<'_>) -> Result<Derivation, ReactionError> {
        match category {
            ChangeCategory::GroupCreated { group_id, snapshot } => {
                self.groups.derive(group_id, snapshot).map(Derivation::Writes)
            }
            ChangeCategory::NotificationUpdated {
                notification_id,
                before,
                after,
            } => self.notifications.derive(notification_id, before, after),
            ChangeCategory::OutOfScope { collection, kind } => {
                Ok(Derivation::NoOp(IgnoreReason::UnrecognizedCategory {
                    collection: collection.to_string(),
                    kind,
                }))
            }
        }
    }

    /// Handle one change event end to end.
    ///
    /// Errors are logged here with the event's context before being returned,
    /// so callers only need to decide whether the event may be redelivered.
    #[instrument(
        skip(self, event),
        fields(collection = %event.collection, document_id = %event.document_id, kind = %event.kind)
    )]
    pub async fn dispatch(&self, event: &ChangeEvent) -> Result<ReactionOutcome, ReactionError> {
        let result = self.react(event).await;

        match &result {
            Ok(ReactionOutcome::Applied(batch)) => log_applied(batch),
            Ok(ReactionOutcome::Ignored(reason)) => match reason {
                IgnoreReason::UnrecognizedCategory { .. } => {
                    debug!(reason = %reason, "Event out of scope")
                }
                IgnoreReason::TransitionFiltered { .. } => {
                    debug!(reason = %reason, "Notification update ignored")
                }
                IgnoreReason::UnhandledNotificationType(notification_type) => info!(
                    notification_type = %notification_type,
                    "Unhandled notification type"
                ),
            },
            Err(ReactionError::MissingData(msg)) => warn!(error = %msg, "Missing event data"),
            Err(ReactionError::ValidationError(msg)) => {
                warn!(error = %msg, "Event failed validation")
            }
            Err(e @ ReactionError::StoreFailure(_)) => error!(
                error = %e,
                retryable = e.is_retryable(),
                "Failed to apply derived writes"
            ),
        }

        result
    }

    /// Entry point for changes to the `groups` collection.
    ///
    /// Events for any other collection are ignored.
    pub async fn on_group_event(&self, event: &ChangeEvent) -> Result<ReactionOutcome, ReactionError> {
        self.dispatch_for(Collection::Groups, event).await
    }

    /// Entry point for changes to the `notifications` collection.
    ///
    /// Events for any other collection are ignored.
    pub async fn on_notification_event(
        &self,
        event: &ChangeEvent,
    ) -> Result<ReactionOutcome, ReactionError> {
        self.dispatch_for(Collection::Notifications, event).await
    }

    async fn dispatch_for(
        &self,
        collection: Collection,
        event: &ChangeEvent,
    ) -> Result<ReactionOutcome, ReactionError> {
        if event.known_collection() != Some(collection) {
            return Ok(ReactionOutcome::Ignored(IgnoreReason::UnrecognizedCategory {
                collection: event.collection.clone(),
                kind: event.kind,
            }));
        }
        self.dispatch(event).await
    }

    async fn react(&self, event: &ChangeEvent) -> Result<ReactionOutcome, ReactionError> {
        match self.derive(Self::classify(event))? {
            Derivation::Writes(batch) => {
                self.applier.apply(&batch).await?;
                Ok(ReactionOutcome::Applied(batch))
            }
            Derivation::NoOp(reason) => Ok(ReactionOutcome::Ignored(reason)),
        }
    }
}

fn log_applied(batch: &WriteBatch) {
    match batch.as_slice() {
        [first, ..] if first.field == SetField::MemberIds => info!(
            user_id = %first.value,
            group_id = %first.key.id,
            "Successfully added user {} to group {}",
            first.value,
            first.key.id
        ),
        [first, ..] if first.field == SetField::Friends => info!(
            user_a = %first.key.id,
            user_b = %first.value,
            "Successfully updated friends list for users {} and {}",
            first.key.id,
            first.value
        ),
        [first, ..] => info!(
            group_id = %first.value,
            user_id = %first.key.id,
            "Successfully added group {} to user {}'s groups list",
            first.value,
            first.key.id
        ),
        [] => {}
    }
}
