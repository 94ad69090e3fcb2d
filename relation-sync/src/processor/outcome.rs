//! Classification and outcome types shared by the dispatcher and reactors.

use relation_sync_shared::{ChangeKind, WriteBatch};
use serde_json::Value;
use std::fmt;

/// A change event classified by the reaction it calls for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChangeCategory<'a> {
    /// A document was created in `groups`.
    GroupCreated {
        group_id: &'a str,
        snapshot: Option<&'a Value>,
    },
    /// A document was updated in `notifications`.
    NotificationUpdated {
        notification_id: &'a str,
        before: Option<&'a Value>,
        after: Option<&'a Value>,
    },
    /// Any other collection and kind combination.
    OutOfScope { collection: &'a str, kind: ChangeKind },
}

/// Why an event produced no writes without being an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No reaction is defined for this collection and kind.
    UnrecognizedCategory { collection: String, kind: ChangeKind },
    /// The update was not a transition into the accepted status.
    TransitionFiltered {
        from: Option<String>,
        to: Option<String>,
    },
    /// An accepted notification of a type that has no relationship effect.
    UnhandledNotificationType(String),
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedCategory { collection, kind } => {
                write!(f, "no reaction for {} {}", collection, kind)
            }
            Self::TransitionFiltered { from, to } => write!(
                f,
                "status {} -> {} is not an acceptance",
                from.as_deref().unwrap_or("<none>"),
                to.as_deref().unwrap_or("<none>")
            ),
            Self::UnhandledNotificationType(t) => write!(f, "unhandled notification type '{}'", t),
        }
    }
}

/// What a reactor derived from one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Derivation {
    Writes(WriteBatch),
    NoOp(IgnoreReason),
}

/// Result of fully handling one event.
#[derive(Debug, Clone, PartialEq)]
pub enum ReactionOutcome {
    /// The batch was committed.
    Applied(WriteBatch),
    /// Nothing needed to be written.
    Ignored(IgnoreReason),
}

impl ReactionOutcome {
    /// Number of writes committed for the event.
    pub fn write_count(&self) -> usize {
        match self {
            Self::Applied(batch) => batch.len(),
            Self::Ignored(_) => 0,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}
