//! Reaction to notification status transitions.
//!
//! Only the move into the accepted status has an effect. Accepted friend
//! requests become a symmetric friend edge; accepted group invitations become
//! a membership on both the group and the invitee's profile.

use relation_sync_shared::{
    DocumentKey, Notification, NotificationType, SetField, UnionWrite, WriteBatch,
};
use serde_json::Value;

use crate::errors::ReactionError;
use crate::processor::outcome::{Derivation, IgnoreReason};

#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationTransitionReactor;

impl NotificationTransitionReactor {
    pub fn new() -> Self {
        Self
    }

    pub fn derive(
        &self,
        notification_id: &str,
        before: Option<&Value>,
        after: Option<&Value>,
    ) -> Result<Derivation, ReactionError> {
        let (before, after) = match (before, after) {
            (Some(before), Some(after)) => (before, after),
            _ => {
                return Err(ReactionError::missing_data(format!(
                    "no notification data found for {}",
                    notification_id
                )))
            }
        };

        let before = decode(notification_id, before)?;
        let after = decode(notification_id, after)?;

        if !Notification::is_acceptance(&before, &after) {
            return Ok(Derivation::NoOp(IgnoreReason::TransitionFiltered {
                from: before.status,
                to: after.status,
            }));
        }

        match &after.notification_type {
            NotificationType::Friend => friend_edge(&after).map(Derivation::Writes),
            NotificationType::GroupInvitation => membership(&after).map(Derivation::Writes),
            other => Ok(Derivation::NoOp(IgnoreReason::UnhandledNotificationType(
                other.to_string(),
            ))),
        }
    }
}

fn decode(notification_id: &str, snapshot: &Value) -> Result<Notification, ReactionError> {
    Notification::from_snapshot(notification_id, snapshot).map_err(|e| {
        ReactionError::validation(format!("notification {} is malformed: {}", notification_id, e))
    })
}

fn required<'a>(
    notification: &'a Notification,
    value: &'a Option<String>,
    field: &str,
) -> Result<&'a str, ReactionError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ReactionError::validation(format!(
            "accepted {} notification {} is missing {}",
            notification.notification_type, notification.notification_id, field
        ))),
    }
}

/// `friends(A) ∪= {B}` and `friends(B) ∪= {A}` in one batch.
fn friend_edge(notification: &Notification) -> Result<WriteBatch, ReactionError> {
    let sender = required(notification, &notification.send_user_id, "sendUserId")?;
    let receiver = required(notification, &notification.receive_user_id, "receiveUserId")?;

    Ok([
        UnionWrite::new(DocumentKey::user_profile(sender), SetField::Friends, receiver),
        UnionWrite::new(DocumentKey::user_profile(receiver), SetField::Friends, sender),
    ]
    .into_iter()
    .collect())
}

/// `Group(g).memberIds ∪= {B}` and `UserProfile(B).groups ∪= {g}` in one batch.
fn membership(notification: &Notification) -> Result<WriteBatch, ReactionError> {
    let group_id = required(notification, &notification.group_id, "groupId")?;
    let receiver = required(notification, &notification.receive_user_id, "receiveUserId")?;

    Ok([
        UnionWrite::new(DocumentKey::group(group_id), SetField::MemberIds, receiver),
        UnionWrite::new(DocumentKey::user_profile(receiver), SetField::Groups, group_id),
    ]
    .into_iter()
    .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn writes(derivation: Derivation) -> WriteBatch {
        match derivation {
            Derivation::Writes(batch) => batch,
            Derivation::NoOp(reason) => panic!("expected writes, got no-op: {}", reason),
        }
    }

    #[test]
    fn test_friend_acceptance_is_symmetric() {
        let batch = writes(
            NotificationTransitionReactor::new()
                .derive(
                    "n1",
                    Some(&json!({ "type": "friend", "sendUserId": "u1", "receiveUserId": "u2", "status": "pending" })),
                    Some(&json!({ "type": "friend", "sendUserId": "u1", "receiveUserId": "u2", "status": "accepted" })),
                )
                .unwrap(),
        );

        assert_eq!(
            batch.as_slice(),
            &[
                UnionWrite::new(DocumentKey::user_profile("u1"), SetField::Friends, "u2"),
                UnionWrite::new(DocumentKey::user_profile("u2"), SetField::Friends, "u1"),
            ]
        );
    }

    #[test]
    fn test_self_friendship_collapses_to_one_write() {
        let after = json!({ "type": "friend", "sendUserId": "u1", "receiveUserId": "u1", "status": "accepted" });
        let batch = writes(
            NotificationTransitionReactor::new()
                .derive("n1", Some(&json!({ "status": "pending" })), Some(&after))
                .unwrap(),
        );
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_group_invitation_acceptance() {
        let after = json!({ "type": "groupInvitation", "receiveUserId": "u2", "groupId": "g1", "status": "accepted" });
        let batch = writes(
            NotificationTransitionReactor::new()
                .derive("n1", Some(&json!({ "status": "pending" })), Some(&after))
                .unwrap(),
        );

        assert_eq!(
            batch.as_slice(),
            &[
                UnionWrite::new(DocumentKey::group("g1"), SetField::MemberIds, "u2"),
                UnionWrite::new(DocumentKey::user_profile("u2"), SetField::Groups, "g1"),
            ]
        );
    }

    #[test]
    fn test_group_invitation_without_group_id() {
        let after = json!({ "type": "groupInvitation", "receiveUserId": "u2", "status": "accepted" });
        let result = NotificationTransitionReactor::new().derive(
            "n1",
            Some(&json!({ "status": "pending" })),
            Some(&after),
        );
        assert!(matches!(result, Err(ReactionError::ValidationError(_))));
    }

    #[test]
    fn test_blank_participants_are_rejected() {
        let after = json!({ "type": "friend", "sendUserId": "", "receiveUserId": "u2", "status": "accepted" });
        let result = NotificationTransitionReactor::new().derive(
            "n1",
            Some(&json!({ "status": "pending" })),
            Some(&after),
        );
        assert!(matches!(result, Err(ReactionError::ValidationError(_))));
    }

    #[test]
    fn test_non_acceptance_transitions_are_filtered() {
        let reactor = NotificationTransitionReactor::new();
        let friend = |status: &str| json!({ "type": "friend", "sendUserId": "u1", "receiveUserId": "u2", "status": status });

        for (from, to) in [("accepted", "accepted"), ("pending", "declined"), ("accepted", "pending")] {
            let derivation = reactor
                .derive("n1", Some(&friend(from)), Some(&friend(to)))
                .unwrap();
            assert!(
                matches!(derivation, Derivation::NoOp(IgnoreReason::TransitionFiltered { .. })),
                "{} -> {} should be filtered",
                from,
                to
            );
        }
    }

    #[test]
    fn test_other_types_are_unhandled() {
        let reactor = NotificationTransitionReactor::new();
        for kind in ["reaction", "comment", "mention"] {
            let derivation = reactor
                .derive(
                    "n1",
                    Some(&json!({ "type": kind, "status": "pending" })),
                    Some(&json!({ "type": kind, "status": "accepted" })),
                )
                .unwrap();
            assert_eq!(
                derivation,
                Derivation::NoOp(IgnoreReason::UnhandledNotificationType(kind.to_string()))
            );
        }
    }

    #[test]
    fn test_missing_snapshot() {
        let result = NotificationTransitionReactor::new().derive(
            "n1",
            None,
            Some(&json!({ "status": "accepted" })),
        );
        assert!(matches!(result, Err(ReactionError::MissingData(_))));
    }
}
